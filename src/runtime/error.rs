use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

/// Fatal evaluation errors. Recoverable conditions (arity overflow,
/// precision loss, lenient call-arity mismatch) go through the warning
/// channel instead, so callers can tell the two apart.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Unknown symbol `{name}`")]
    UnknownSymbol { name: String },
    #[error("Unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("`{operator}` expects at least {minimum} operand(s) but received {received}")]
    TooFewOperands {
        operator: String,
        minimum: usize,
        received: usize,
    },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("Integer division by zero")]
    DivisionByZero,
    #[error("Malformed input `{token}`: expected an integer or decimal number")]
    MalformedInput { token: String },
    #[error("Input stream exhausted during read")]
    InputExhausted,
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal invariant violation: {message}")]
    Internal { message: String },
}
