pub mod config;
pub mod error;
pub mod lex;
pub mod parse;
pub mod stack;
pub mod util;
pub mod walker;

use tracing::debug;
use crate::util::ident;

pub use crate::{
    config::Config,
    error::Error,
    parse::{parse, Program},
    walker::{
        error::EvalError,
        heap::AllocPolicy,
        value::Value,
        Interpreter,
    },
};

/// An evaluator instance. Globals and heap persist across calls to [`Engine::execute`].
#[derive(Default)]
pub struct Engine {
    interp: Interpreter,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self { interp: Interpreter::new(config) }
    }

    /// Parse and run `code`. Syntax errors are returned as `Err`; runtime errors come back as
    /// `Ok(Value::Error(_))`.
    ///
    /// Arrays returned here stay readable after the engine is dropped. References do not: once
    /// the engine is gone every non-numeric heap slot is freed.
    pub fn execute(&mut self, code: &str) -> Result<Value, Vec<Error>> {
        let program = parse(code)?;
        debug!(defines = program.defines.len(), "parsed program");
        Ok(self.eval_program(&program))
    }

    pub fn eval_program(&mut self, program: &Program) -> Value {
        self.interp.value_of(program)
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.interp.globals().get(ident(name))
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }
}
