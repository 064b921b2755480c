use thiserror::Error;

/// Typed errors produced while executing a program. None of these are
/// recoverable inside the interpreter; they unwind to the caller of the
/// top-level `execute`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Unknown variable '{name}'")]
    UnknownVariable { name: String },
    #[error("Wrong type: expected {expected}")]
    WrongType { expected: &'static str },
    #[error("Method '{method}' taking {arity} argument(s) can not be found")]
    MethodNotFound { method: String, arity: usize },
    #[error("Objects cannot be compared")]
    NotComparable,
    #[error("Denominator is 0")]
    DivisionByZero,
    #[error("{operation} is unavailable for these types")]
    UnsupportedOperation { operation: &'static str },
    #[error("Failed to write program output: {message}")]
    Output { message: String },
}

impl RuntimeError {
    pub(crate) fn output(error: std::io::Error) -> Self {
        Self::Output {
            message: error.to_string(),
        }
    }
}
