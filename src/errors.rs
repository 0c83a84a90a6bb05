use thiserror::Error;

// Errors raised while parsing or running code inside a context
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    // Input could not be parsed; usually means an incomplete expression
    #[error("SyntaxError: {0}")]
    Syntax(String),

    // Lookup of a name that has no binding
    #[error("ReferenceError: {0}")]
    Reference(String),

    // Operation applied to a value of the wrong kind
    #[error("TypeError: {0}")]
    Type(String),

    // Numeric operation outside its domain (division by zero and friends)
    #[error("RangeError: {0}")]
    Range(String),
}

impl EvalError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, EvalError::Syntax(_))
    }
}

// Type alias for results that use `EvalError` as the error type
pub type Result<T> = std::result::Result<T, EvalError>;

/// Failures of the context registry. None of them mutate registry state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unique context prefix {prefix:?} cannot end in a number")]
    InvalidPrefix { prefix: String },

    #[error("unique context ids for prefix {prefix:?} are exhausted")]
    Exhausted { prefix: String },
}

/// Startup and transport failures of the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not load globals from {path}: {reason}")]
    Globals { path: String, reason: String },
}
