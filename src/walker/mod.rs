pub mod env;
pub mod error;
pub mod heap;
pub mod value;

use std::{env as process_env, fs, path::PathBuf, rc::Rc};
use tracing::{debug, trace};
use crate::{
    config::Config,
    parse::{self, ArithOp, BinaryOp, Define, Expr, Lambda, Literal, Program, UnaryOp},
    stack::ensure_sufficient_stack,
    util::{ident, Ident},
};
use self::{
    env::{Env, Globals},
    error::EvalError,
    heap::{Heap, HeapRef, SharedHeap},
    value::{Array, Closure, Value},
};

/// A tree-walking evaluator. Each instance owns its own global frame and heap.
pub struct Interpreter {
    globals: Globals,
    heap: SharedHeap,
    config: Config,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        let this = Self {
            globals: Globals::default(),
            heap: Heap::shared(config.heap_capacity, config.alloc_policy),
            config,
        };
        this.install_builtins();
        this
    }

    /// `read` and `require` are ordinary closures over the global frame whose bodies use the
    /// built-in `read` and `eval` forms.
    fn install_builtins(&self) {
        let file = ident("file");
        let read_file = || Expr::unary(UnaryOp::Read, Expr::Var(file));

        self.install_procedure("read", vec![file], read_file());
        self.install_procedure("require", vec![file], Expr::unary(UnaryOp::Eval, read_file()));
    }

    fn install_procedure(&self, name: &str, formals: Vec<Ident>, body: Expr) {
        let closure = Closure {
            env: self.global_env(),
            lambda: Rc::new(Lambda { formals, default: None, body }),
        };
        self.globals.define(ident(name), Value::Closure(Rc::new(closure)));
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn global_env(&self) -> Env {
        Env::Global(self.globals.clone())
    }

    pub fn heap(&self) -> &SharedHeap {
        &self.heap
    }

    /// Run a program, turning any dynamic error into an error value.
    pub fn value_of(&self, program: &Program) -> Value {
        match self.exec_program(program, &self.global_env()) {
            Ok(val) => val,
            Err(err) => {
                debug!(error = %err, "program failed");
                Value::Error(err.to_string())
            },
        }
    }

    /// Run every top-level definition in order, then the main expression, all against the
    /// global frame. The `env` a program is handed is not consulted.
    pub fn exec_program(&self, program: &Program, _env: &Env) -> Result<Value, EvalError> {
        debug!(defines = program.defines.len(), "running program");
        let global = self.global_env();
        for define in &program.defines {
            self.exec_define(define, &global)?;
        }
        self.exec(&program.main, &global)
    }

    pub fn exec_define(&self, define: &Define, env: &Env) -> Result<Value, EvalError> {
        let value = self.exec(&define.value, env)?;
        debug!(name = define.name.as_str(), "define");
        self.globals.define(define.name, value);
        Ok(Value::Unit)
    }

    pub fn exec(&self, expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        ensure_sufficient_stack(|| self.exec_inner(expr, env))
    }

    fn exec_inner(&self, expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(l) => Ok(match l {
                Literal::Number(x) => Value::Number(*x),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Unit => Value::Unit,
            }),
            Expr::Var(name) => env.lookup(*name),
            Expr::Arith(op, operands) => self.exec_arith(*op, operands, expr, env),
            Expr::Let(bindings, body) => {
                let values = bindings
                    .iter()
                    .map(|(_, value)| self.exec(value, env))
                    .collect::<Result<Vec<_>, _>>()?;
                let env = bindings
                    .iter()
                    .zip(values)
                    .fold(env.clone(), |env, ((name, _), value)| env.extend(*name, value));
                self.exec(body, &env)
            },
            Expr::Lambda(lambda) => {
                let captured = match (&lambda.default, lambda.formals.last()) {
                    (Some(default), Some(last)) => env.extend(*last, self.exec(default, env)?),
                    _ => env.clone(),
                };
                Ok(Value::Closure(Rc::new(Closure {
                    env: captured,
                    lambda: lambda.clone(),
                })))
            },
            Expr::Call(operator, operands) => self.exec_call(operator, operands, expr, env),
            Expr::If(cond, a, b) => match self.exec(cond, env)? {
                Value::Bool(true) => self.exec(a, env),
                Value::Bool(false) => self.exec(b, env),
                _ => Err(EvalError::NotABoolean(expr.to_string())),
            },
            Expr::Unary(op, a) => self.exec_unary(*op, a, expr, env),
            Expr::Binary(op, a, b) => {
                let a = self.exec(a, env)?;
                let b = self.exec(b, env)?;
                match op {
                    BinaryOp::Cons => Ok(Value::cons(a, b)),
                    BinaryOp::SetRef => {
                        let r = as_ref(&a, expr)?;
                        trace!(loc = r.loc(), "set!");
                        Ok(self.heap.borrow_mut().set(r, b)?)
                    },
                    BinaryOp::Less => Ok(Value::Bool(as_number(&a, expr)? < as_number(&b, expr)?)),
                    BinaryOp::Greater => Ok(Value::Bool(as_number(&a, expr)? > as_number(&b, expr)?)),
                    BinaryOp::Equal => Ok(Value::Bool(a.equals(&b))),
                }
            },
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.exec(item, env))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items
                    .into_iter()
                    .rev()
                    .fold(Value::EmptyList, |tail, head| Value::cons(head, tail)))
            },
            Expr::Array(dims) => self.exec_alloc_array(dims, env),
            Expr::Index { array, indices } => {
                let (array, offset) = self.locate_cell(array, indices, env, IndexCheck::Read)?;
                let val = self.heap.borrow().get(array.cells[offset])?.clone();
                Ok(val)
            },
            Expr::Assign { array, indices, value } => {
                let (array, offset) = self.locate_cell(array, indices, env, IndexCheck::Write)?;
                let value = match self.exec(value, env)? {
                    val @ Value::Number(_) => val,
                    _ => return Err(EvalError::NonNumericArrayValue),
                };
                self.heap.borrow_mut().set(array.cells[offset], value)?;
                Ok(Value::Array(array))
            },
        }
    }

    fn exec_arith(&self, op: ArithOp, operands: &[Expr], expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        let operand = |e: &Expr| self.exec(e, env).and_then(|val| as_number(&val, expr));
        let result = match op {
            ArithOp::Add => operands.iter().try_fold(0.0, |acc, e| Ok::<_, EvalError>(acc + operand(e)?))?,
            ArithOp::Mul => operands.iter().try_fold(1.0, |acc, e| Ok::<_, EvalError>(acc * operand(e)?))?,
            ArithOp::Sub | ArithOp::Div => match operands.split_first() {
                Some((first, rest)) => {
                    let seed = operand(first)?;
                    rest.iter().try_fold(seed, |acc, e| {
                        let rhs = operand(e)?;
                        Ok::<_, EvalError>(if op == ArithOp::Sub { acc - rhs } else { acc / rhs })
                    })?
                },
                None if op == ArithOp::Sub => 0.0,
                None => 1.0,
            },
        };
        Ok(Value::Number(result))
    }

    fn exec_call(&self, operator: &Expr, operands: &[Expr], expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        let closure = match self.exec(operator, env)? {
            Value::Closure(closure) => closure,
            _ => return Err(EvalError::NotAFunction(expr.to_string())),
        };

        let actuals = operands
            .iter()
            .map(|arg| self.exec(arg, env))
            .collect::<Result<Vec<_>, _>>()?;

        let formals = &closure.lambda.formals;
        let bound = if actuals.len() == formals.len() {
            formals.len()
        } else if closure.has_default() && actuals.len() + 1 == formals.len() {
            actuals.len()
        } else {
            return Err(EvalError::ArgumentMismatch(expr.to_string()));
        };

        trace!(call = %expr, "call");
        let call_env = formals[..bound]
            .iter()
            .zip(actuals)
            .fold(closure.env.clone(), |env, (name, value)| env.extend(*name, value));
        self.exec(&closure.lambda.body, &call_env)
    }

    fn exec_unary(&self, op: UnaryOp, a: &Expr, expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        let val = self.exec(a, env)?;
        match op {
            UnaryOp::Car => match val {
                Value::Pair(pair) => Ok(pair.0.clone()),
                _ => Err(EvalError::NotAPair(expr.to_string())),
            },
            UnaryOp::Cdr => match val {
                Value::Pair(pair) => Ok(pair.1.clone()),
                _ => Err(EvalError::NotAPair(expr.to_string())),
            },
            UnaryOp::IsNull => Ok(Value::Bool(matches!(val, Value::EmptyList))),
            UnaryOp::IsList => Ok(Value::Bool(val.looks_like_list(matches!(a, Expr::List(_))))),
            UnaryOp::Is(tag) => Ok(Value::Bool(val.is(tag))),
            UnaryOp::Ref => {
                let r = self.heap.borrow_mut().insert(val)?;
                trace!(loc = r.loc(), "ref");
                Ok(Value::Ref(r))
            },
            UnaryOp::Deref => {
                let r = as_ref(&val, expr)?;
                let val = self.heap.borrow().get(r)?.clone();
                Ok(val)
            },
            UnaryOp::Free => {
                let r = as_ref(&val, expr)?;
                self.heap.borrow_mut().free(r)?;
                Ok(Value::Unit)
            },
            UnaryOp::Eval => {
                let code = as_string(&val, expr)?;
                debug!(len = code.len(), "eval");
                let program = parse::parse(code).map_err(|errors| {
                    let messages = errors
                        .iter()
                        .map(|err| err.in_context(code))
                        .collect::<Vec<_>>();
                    EvalError::Syntax(messages.join("; "))
                })?;
                self.exec_program(&program, env)
            },
            UnaryOp::Read => self.read_file(as_string(&val, expr)?).map(Value::String),
        }
    }

    fn read_file(&self, name: &str) -> Result<String, EvalError> {
        let base = match &self.config.base_dir {
            Some(dir) => dir.clone(),
            None => process_env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let path = base.join(name);
        debug!(path = %path.display(), "read");
        fs::read_to_string(&path).map_err(|err| EvalError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }

    fn exec_alloc_array(&self, dim_exprs: &[Expr], env: &Env) -> Result<Value, EvalError> {
        let mut dims = Vec::with_capacity(dim_exprs.len());
        for e in dim_exprs {
            let dim = match self.exec(e, env)? {
                Value::Number(x) if x.fract() == 0.0 => x,
                _ => return Err(EvalError::ArraySizeNotInt),
            };
            if dim <= 0.0 {
                return Err(EvalError::ArraySizeNotPositive);
            }
            dims.push(dim as usize);
        }

        let count = if dims.is_empty() {
            0
        } else {
            dims.iter().try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
                .ok_or(heap::HeapError::OutOfMemory)?
        };

        let mut heap = self.heap.borrow_mut();
        let cells = (0..count)
            .map(|_| heap.insert(Value::Number(0.0)))
            .collect::<Result<Vec<HeapRef>, _>>()?;
        drop(heap);

        Ok(Value::Array(Rc::new(Array {
            dims,
            cells,
            heap: self.heap.clone(),
        })))
    }

    /// Evaluate the array and index operands of `index`/`assign` and find the addressed cell.
    fn locate_cell(
        &self,
        array: &Expr,
        indices: &[Expr],
        env: &Env,
        check: IndexCheck,
    ) -> Result<(Rc<Array>, usize), EvalError> {
        let array = match self.exec(array, env)? {
            Value::Array(array) => array,
            _ => return Err(EvalError::NotAnArray),
        };
        if array.dims.is_empty() {
            return Err(EvalError::EmptyArray);
        }

        let mut coords = Vec::with_capacity(indices.len());
        for (i, e) in indices.iter().enumerate() {
            let index = check.coordinate(self.exec(e, env)?)?;
            match array.dims.get(i) {
                None => return Err(EvalError::WrongIndexCount),
                Some(dim) if index > *dim => return Err(EvalError::IndexOutOfBounds),
                Some(_) => coords.push(index),
            }
        }
        if coords.len() != array.dims.len() {
            return Err(EvalError::WrongIndexCount);
        }

        let offset = array.offset_of(&coords);
        Ok((array, offset))
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // Closures in the global frame capture the global frame, and arrays stored in the heap
        // point back at the heap.
        self.globals.clear();
        if let Ok(mut heap) = self.heap.try_borrow_mut() {
            heap.release_non_numeric();
        }
    }
}

/// `index` and `assign` report malformed coordinates with different messages.
#[derive(Copy, Clone)]
enum IndexCheck {
    Read,
    Write,
}

impl IndexCheck {
    fn coordinate(self, val: Value) -> Result<usize, EvalError> {
        let x = match val {
            Value::Number(x) if x.fract() == 0.0 => x,
            _ => return Err(match self {
                IndexCheck::Read => EvalError::IndexNotPositiveInt,
                IndexCheck::Write => EvalError::IndexNotInt,
            }),
        };
        if x <= 0.0 {
            return Err(match self {
                IndexCheck::Read => EvalError::IndexNotPositiveInt,
                IndexCheck::Write => EvalError::IndexNotPositive,
            });
        }
        Ok(x as usize)
    }
}

fn as_number(val: &Value, expr: &Expr) -> Result<f64, EvalError> {
    match val {
        Value::Number(x) => Ok(*x),
        _ => Err(EvalError::NotANumber(expr.to_string())),
    }
}

fn as_ref(val: &Value, expr: &Expr) -> Result<HeapRef, EvalError> {
    match val {
        Value::Ref(r) => Ok(*r),
        _ => Err(EvalError::NotAReference(expr.to_string())),
    }
}

fn as_string<'a>(val: &'a Value, expr: &Expr) -> Result<&'a str, EvalError> {
    match val {
        Value::String(s) => Ok(s.as_str()),
        _ => Err(EvalError::NotAString(expr.to_string())),
    }
}
