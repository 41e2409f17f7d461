//! Runtime errors raised by the machine and by primitives.

use thiserror::Error;

/// Errors that can occur while running bytecode.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("unbound variable: {0}")]
    Unbound(String),

    #[error("cannot call a value of type {0}")]
    NotCallable(&'static str),

    #[error("wrong number of arguments: expected {expected}, got {found}")]
    Arity { expected: String, found: usize },

    #[error("{operation}: expected {expected}, got {found}")]
    Type {
        operation: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown primitive: {0}")]
    UnknownPrimitive(String),

    #[error("invalid lexical address ({frame}, {slot})")]
    BadAddress { frame: usize, slot: usize },

    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("return with no return point on the stack")]
    NoReturnPoint,

    #[error("stack overflow: more than {0} slots")]
    StackOverflow(usize),

    #[error("{0}")]
    Signal(String),
}

impl RuntimeError {
    pub fn type_error(operation: &'static str, expected: &'static str, found: &'static str) -> Self {
        Self::Type {
            operation,
            expected,
            found,
        }
    }
}
