//! Error types for the Jet engine.
//!
//! Binding-time problems and run-time problems never mix: a program that
//! binds can only fail while running, and a program that fails to bind is
//! never run.

use std::fmt;

use jet_parser::{Position, SyntaxError};
use thiserror::Error;

/// Reasons the binder rejects a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("Duplicate declaration: {0}")]
    DuplicateDeclaration(String),
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("Duplicate argument name: {0}")]
    DuplicateArgument(String),
    #[error("Invalid number of arguments. Expected {expected}, got {actual}.")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("Malformed statement")]
    Malformed,
}

/// A program could not be built. Carries every error found, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct SyntaxException {
    pub errors: Vec<SyntaxError>,
}

impl SyntaxException {
    pub fn new(errors: Vec<SyntaxError>) -> Self {
        Self { errors }
    }
}

impl fmt::Display for SyntaxException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl From<Vec<SyntaxError>> for SyntaxException {
    fn from(errors: Vec<SyntaxError>) -> Self {
        Self::new(errors)
    }
}

/// A fault while running a program, attributed to the node that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{position} {message}")]
pub struct RuntimeError {
    pub position: Position,
    pub message: String,
}

impl RuntimeError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    pub fn type_mismatch(position: Position, expected: &str, found: &str) -> Self {
        Self::new(position, format!("Expected a {}, got a {}.", expected, found))
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }
}

/// Why a run did not complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    /// The program is faulty.
    #[error(transparent)]
    Execution(#[from] RuntimeError),
    /// The caller asked the run to stop.
    #[error("Execution cancelled")]
    Cancelled,
    /// The executor dropped the run without executing it.
    #[error("Execution abandoned by its executor")]
    Abandoned,
}

impl RunError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled)
    }
}

/// Any failure of the source-to-output pipeline.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("{0}")]
    Syntax(#[from] SyntaxException),
    #[error("{0}")]
    Run(#[from] RunError),
}
