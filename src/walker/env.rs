use std::{cell::RefCell, collections::HashMap, rc::Rc};
use crate::util::Ident;
use super::{error::EvalError, value::Value};

/// The single mutable frame at the root of every environment chain.
#[derive(Clone, Default)]
pub struct Globals(Rc<RefCell<HashMap<Ident, Value>>>);

impl Globals {
    /// Bind `name`, replacing any earlier global binding.
    pub fn define(&self, name: Ident, value: Value) {
        self.0.borrow_mut().insert(name, value);
    }

    pub fn get(&self, name: Ident) -> Option<Value> {
        self.0.borrow().get(&name).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct Frame {
    name: Ident,
    value: Value,
    parent: Env,
}

/// A persistent chain of single-binding frames ending in the global frame.
#[derive(Clone)]
pub enum Env {
    Global(Globals),
    Extend(Rc<Frame>),
}

impl Env {
    /// Find the innermost binding of `name`.
    pub fn get(&self, name: Ident) -> Option<Value> {
        let mut env = self;
        loop {
            match env {
                Env::Extend(frame) if frame.name == name => return Some(frame.value.clone()),
                Env::Extend(frame) => env = &frame.parent,
                Env::Global(globals) => return globals.get(name),
            }
        }
    }

    pub fn lookup(&self, name: Ident) -> Result<Value, EvalError> {
        self.get(name)
            .ok_or_else(|| EvalError::Unbound(name.as_str().to_string()))
    }

    /// A new environment with `name` bound in front of this one. `self` is left untouched.
    pub fn extend(&self, name: Ident, value: Value) -> Env {
        Env::Extend(Rc::new(Frame {
            name,
            value,
            parent: self.clone(),
        }))
    }
}

impl From<Globals> for Env {
    fn from(globals: Globals) -> Self {
        Env::Global(globals)
    }
}
