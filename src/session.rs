//! One interpreter session: the host-side pipeline
//! scan → parse → resolve → interpret.
//!
//! Each call to [`Session::run`] is an independent unit whose outcome is
//! returned as a value; nothing is remembered about earlier failures, so a
//! REPL can keep feeding lines after an error.  Global state (variables,
//! functions, classes) does persist between units.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::scanner;
use crate::value::Value;

/// Why a unit did not run to completion.
#[derive(Debug, Error)]
pub enum RunError {
    /// Lexical, syntax or resolution errors; nothing was executed.
    #[error("{} static error(s)", .0.len())]
    Static(Vec<LoxError>),

    /// Execution started and stopped at this error.
    #[error(transparent)]
    Runtime(LoxError),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => 65,
            RunError::Runtime(e) => e.exit_code(),
        }
    }

    /// Every diagnostic carried, in report order.
    pub fn diagnostics(&self) -> Vec<&LoxError> {
        match self {
            RunError::Static(errors) => errors.iter().collect(),
            RunError::Runtime(e) => vec![e],
        }
    }
}

pub struct Session {
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Interpreter::new())
    }
}

impl Session {
    pub fn new(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    /// Session whose `print` output goes to `output`.
    pub fn with_output(output: Rc<RefCell<dyn Write>>) -> Self {
        Self::new(Interpreter::with_output(output))
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Runs `source` as one unit.  Any static error suppresses execution of
    /// the whole unit.
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        info!("Running unit of {} bytes", source.len());

        let (tokens, mut errors) = scanner::scan(source);

        // Parse even after lexical errors so syntax errors are reported too.
        let statements = match Parser::new(tokens).parse() {
            Ok(statements) => statements,
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(RunError::Static(errors));
            }
        };

        let locals = Resolver::new().resolve(&statements);
        self.admit(locals, errors)?;

        self.interpreter
            .interpret(&statements)
            .map_err(RunError::Runtime)
    }

    /// Evaluates `source` as a single expression, with the same static
    /// checks as a program.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, RunError> {
        info!("Evaluating expression of {} bytes", source.len());

        let (tokens, mut errors) = scanner::scan(source);

        let expr = match Parser::new(tokens).parse_expression() {
            Ok(expr) => expr,
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(RunError::Static(errors));
            }
        };

        let locals = Resolver::new().resolve_expression(&expr);
        self.admit(locals, errors)?;

        self.interpreter
            .evaluate(&expr)
            .map_err(RunError::Runtime)
    }

    /// Gate between the static passes and execution: binding distances reach
    /// the interpreter only for a unit with no static error at all.
    fn admit(
        &mut self,
        resolved: Result<Locals, Vec<LoxError>>,
        mut errors: Vec<LoxError>,
    ) -> Result<(), RunError> {
        match resolved {
            Ok(locals) if errors.is_empty() => {
                self.interpreter.record_locals(locals);
                return Ok(());
            }
            Ok(_) => {}
            Err(resolve_errors) => errors.extend(resolve_errors),
        }

        debug!("Skipping execution: {} static error(s)", errors.len());
        Err(RunError::Static(errors))
    }
}
