use std::{fmt, mem, rc::Rc};
use crate::{
    parse::{Lambda, TypeTag},
    util::format_number,
};
use super::{
    env::Env,
    heap::{HeapRef, SharedHeap},
};

#[derive(Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    String(String),
    Unit,
    Pair(Rc<Pair>),
    EmptyList,
    Closure(Rc<Closure>),
    Ref(HeapRef),
    Array(Rc<Array>),
    Error(String),
}

/// A cons cell.
pub struct Pair(pub Value, pub Value);

impl Drop for Pair {
    // Unlinks the tail chain in a loop; only heads drop recursively.
    fn drop(&mut self) {
        let mut tail = mem::replace(&mut self.1, Value::EmptyList);
        while let Value::Pair(next) = tail {
            match Rc::try_unwrap(next) {
                Ok(mut pair) => tail = mem::replace(&mut pair.1, Value::EmptyList),
                Err(_) => break,
            }
        }
    }
}

/// A function value: a lambda together with the environment it was created in.
pub struct Closure {
    pub env: Env,
    pub lambda: Rc<Lambda>,
}

impl Closure {
    pub fn has_default(&self) -> bool {
        self.lambda.default.is_some()
    }
}

/// A row-major table of heap cells.
pub struct Array {
    pub dims: Vec<usize>,
    pub cells: Vec<HeapRef>,
    pub heap: SharedHeap,
}

impl Array {
    /// Map 1-based coordinates onto an offset into `cells`.
    ///
    /// The first two coordinates are laid out row-major; every further coordinate `k` is
    /// weighted by the product of all dimension sizes before it.
    pub fn offset_of(&self, indices: &[usize]) -> usize {
        flat_offset(indices, &self.dims)
    }

    fn render_block(&self, dim: usize, cell: &dyn Fn(usize) -> String, next: &mut usize) -> String {
        let mut parts = Vec::new();
        if dim == 1 {
            for _ in 0..self.dims[0] {
                let mut row = Vec::new();
                for _ in 0..self.dims[1] {
                    row.push(cell(*next));
                    *next += 1;
                }
                parts.push(format!("[{}]", row.join(" ")));
            }
        } else {
            for _ in 0..self.dims[dim] {
                parts.push(self.render_block(dim - 1, cell, next));
            }
        }
        format!("[{}]", parts.join("\n"))
    }
}

pub fn flat_offset(indices: &[usize], dims: &[usize]) -> usize {
    if indices.len() == 1 {
        return indices[0] - 1;
    }
    let mut offset = (indices[1] - 1) + (indices[0] - 1) * dims[1];
    for k in 2..indices.len() {
        let factor: usize = dims[..k].iter().product();
        offset += (indices[k] - 1) * factor;
    }
    offset
}

impl Value {
    pub fn cons(fst: Value, snd: Value) -> Self {
        Value::Pair(Rc::new(Pair(fst, snd)))
    }

    pub fn is(&self, tag: TypeTag) -> bool {
        matches!(
            (tag, self),
            (TypeTag::Number, Value::Number(_))
            | (TypeTag::Boolean, Value::Bool(_))
            | (TypeTag::String, Value::String(_))
            | (TypeTag::Procedure, Value::Closure(_))
            | (TypeTag::Pair, Value::Pair(_))
            | (TypeTag::Unit, Value::Unit)
        )
    }

    /// Whether the right-hand chain of this pair ends in the empty list.
    pub fn is_proper_list(&self) -> bool {
        let mut next = self;
        loop {
            match next {
                Value::EmptyList => return true,
                Value::Pair(pair) => next = &pair.1,
                _ => return false,
            }
        }
    }

    /// The shape test behind `list?`. It looks at most three pairs deep; `literal` is true when
    /// the operand was written as a `list` expression.
    pub fn looks_like_list(&self, literal: bool) -> bool {
        match self {
            Value::EmptyList => true,
            Value::Pair(pair) => match &pair.1 {
                Value::EmptyList => true,
                Value::Pair(inner) => matches!(inner.1, Value::EmptyList | Value::Pair(_)),
                _ => literal,
            },
            _ => literal,
        }
    }

    /// Structural equality as seen by `=`. Walks the tail spine of pairs in a loop.
    pub fn equals(&self, other: &Value) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            match (a, b) {
                (Value::Pair(x), Value::Pair(y)) => {
                    if !x.0.equals(&y.0) {
                        return false;
                    }
                    a = &x.1;
                    b = &y.1;
                },
                (Value::Number(x), Value::Number(y)) => return x == y,
                (Value::Bool(x), Value::Bool(y)) => return x == y,
                (Value::String(x), Value::String(y)) => return x == y,
                (Value::Closure(x), Value::Closure(y)) => return Rc::ptr_eq(x, y),
                (Value::EmptyList, Value::EmptyList) => return true,
                _ => return false,
            }
        }
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(lambda ( ")?;
        let formals = &self.lambda.formals;
        match formals.split_last() {
            Some((last, init)) => match self.env.get(*last) {
                Some(default) => {
                    for formal in init {
                        write!(f, "{} ", formal.as_str())?;
                    }
                    write!(f, "({} = {})", last.as_str(), default)?;
                },
                None => {
                    for formal in formals {
                        write!(f, "{} ", formal.as_str())?;
                    }
                },
            },
            None => {},
        }
        write!(f, ") {})", self.lambda.body)
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let heap = self.heap.borrow();
        let cell = |i: usize| match heap.get(self.cells[i]) {
            Ok(val) => val.to_string(),
            Err(err) => err.to_string(),
        };

        match self.dims.len() {
            0 => write!(f, "[]"),
            1 => {
                let cells = (0..self.cells.len()).map(&cell).collect::<Vec<_>>();
                write!(f, "[{}]", cells.join("\n"))
            },
            rank => {
                let mut next = 0;
                write!(f, "{}", self.render_block(rank - 1, &cell, &mut next))
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{}", format_number(*x)),
            Value::Bool(true) => write!(f, "#t"),
            Value::Bool(false) => write!(f, "#f"),
            Value::String(s) => write!(f, "{}", s),
            Value::Unit => Ok(()),
            Value::Pair(pair) if self.is_proper_list() => {
                write!(f, "({}", pair.0)?;
                let mut next = &pair.1;
                while let Value::Pair(pair) = next {
                    write!(f, " {}", pair.0)?;
                    next = &pair.1;
                }
                write!(f, ")")
            },
            Value::Pair(_) => {
                // `(a (b (c d)))`: nest along the tail without recursing on it
                let mut depth = 0;
                let mut next = self;
                while let Value::Pair(pair) = next {
                    write!(f, "({} ", pair.0)?;
                    depth += 1;
                    next = &pair.1;
                }
                write!(f, "{}{}", next, ")".repeat(depth))
            },
            Value::EmptyList => write!(f, "()"),
            Value::Closure(closure) => write!(f, "{}", closure),
            Value::Ref(r) => write!(f, "{}", r),
            Value::Array(array) => write!(f, "{}", array),
            Value::Error(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Unit => write!(f, "<unit>"),
            Value::Closure(_) => write!(f, "<closure {}>", self),
            Value::Error(msg) => write!(f, "<error {:?}>", msg),
            other => write!(f, "{}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;
    use crate::walker::heap::{AllocPolicy, Heap};

    fn list(items: Vec<Value>) -> Value {
        items
            .into_iter()
            .rev()
            .fold(Value::EmptyList, |tail, head| Value::cons(head, tail))
    }

    fn num(x: f64) -> Value {
        Value::Number(x)
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(num(6.0).to_string(), "6");
        assert_eq!(num(0.5).to_string(), "0.5");
        assert_eq!(Value::Bool(true).to_string(), "#t");
        assert_eq!(Value::Bool(false).to_string(), "#f");
        assert_eq!(Value::String("a b".into()).to_string(), "a b");
        assert_eq!(Value::Unit.to_string(), "");
        assert_eq!(Value::EmptyList.to_string(), "()");
        assert_eq!(Value::Error("boom".into()).to_string(), "boom");
    }

    #[test]
    fn test_render_pairs() {
        assert_eq!(Value::cons(num(1.0), num(2.0)).to_string(), "(1 2)");
        assert_eq!(list(vec![num(1.0), num(2.0), num(3.0)]).to_string(), "(1 2 3)");
        assert_eq!(Value::cons(num(1.0), Value::cons(num(2.0), num(3.0))).to_string(), "(1 (2 3))");
        assert_eq!(list(vec![list(vec![num(1.0)]), Value::EmptyList]).to_string(), "((1) ())");
    }

    #[test]
    fn test_looks_like_list() {
        let one = num(1.0);
        assert!(Value::EmptyList.looks_like_list(false));
        assert!(Value::cons(one.clone(), Value::EmptyList).looks_like_list(false));
        assert!(list(vec![one.clone(), one.clone()]).looks_like_list(false));
        assert!(list(vec![one.clone(), one.clone(), one.clone()]).looks_like_list(false));
        // three pairs deep is enough, whatever ends the chain
        let improper = Value::cons(one.clone(), Value::cons(one.clone(), Value::cons(one.clone(), one.clone())));
        assert!(improper.looks_like_list(false));
        assert!(!Value::cons(one.clone(), one.clone()).looks_like_list(false));
        assert!(!Value::cons(one.clone(), Value::cons(one.clone(), one.clone())).looks_like_list(false));
        assert!(!one.looks_like_list(false));
    }

    #[test]
    fn test_equals() {
        let a = list(vec![num(1.0), Value::String("x".into())]);
        let b = list(vec![num(1.0), Value::String("x".into())]);
        assert!(a.equals(&b));
        assert!(!a.equals(&Value::EmptyList));
        assert!(Value::EmptyList.equals(&Value::EmptyList));
        assert!(!num(1.0).equals(&Value::Bool(true)));
        assert!(!Value::Unit.equals(&Value::Unit));
    }

    #[test]
    fn test_flat_offset() {
        assert_eq!(flat_offset(&[3], &[5]), 2);
        assert_eq!(flat_offset(&[1, 1], &[2, 3]), 0);
        assert_eq!(flat_offset(&[2, 3], &[2, 3]), 5);
        assert_eq!(flat_offset(&[1, 2], &[2, 3]), 1);
        assert_eq!(flat_offset(&[2, 1], &[2, 3]), 3);
        // third coordinate weighted by d0 * d1
        assert_eq!(flat_offset(&[1, 1, 2], &[2, 3, 2]), 6);
        assert_eq!(flat_offset(&[2, 3, 2], &[2, 3, 2]), 11);
    }

    #[test]
    fn test_long_lists() {
        let long = || list((0..60_000).map(|i| num(i as f64)).collect());
        let (a, b) = (long(), long());
        assert!(a.equals(&b));
        assert!(a.is_proper_list());
        assert!(!a.equals(&list((0..59_999).map(|i| num(i as f64)).collect())));
        drop(a);
        drop(b);

        let improper = (0..60_000).fold(num(-1.0), |tail, i| Value::cons(num(i as f64), tail));
        let rendered = improper.to_string();
        assert!(rendered.starts_with("(59999 (59998 "));
        assert!(rendered.ends_with("(0 -1))))"));
        drop(improper);
    }

    #[test]
    fn test_shared_tail_survives_drop() {
        let tail = list(vec![num(2.0), num(3.0)]);
        let whole = Value::cons(num(1.0), tail.clone());
        drop(whole);
        assert_eq!(tail.to_string(), "(2 3)");
    }

    fn array(dims: Vec<usize>) -> Array {
        let heap = Heap::shared(64, AllocPolicy::Monotonic);
        let count: usize = if dims.is_empty() { 0 } else { dims.iter().product() };
        let cells = (0..count)
            .map(|i| heap.borrow_mut().insert(num(i as f64)).unwrap())
            .collect();
        Array { dims, cells, heap }
    }

    #[test]
    fn test_render_arrays() {
        assert_eq!(array(vec![]).to_string(), "[]");
        assert_eq!(array(vec![3]).to_string(), "[0\n1\n2]");
        assert_eq!(array(vec![2, 3]).to_string(), "[[0 1 2]\n[3 4 5]]");
        assert_eq!(array(vec![1, 2, 2]).to_string(), "[[[0 1]]\n[[2 3]]]");
    }
}
