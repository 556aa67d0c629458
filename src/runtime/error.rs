use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("Unbound name `{name}`")]
    UnboundName { name: String },
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("`{name}` is a {type_name}, not a function")]
    NotCallable { name: String, type_name: &'static str },
    #[error("Function `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: String,
        received: usize,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in {operation}")]
    IntegerOverflow { operation: String },
    #[error("Recursion limit of {limit} active calls exceeded in `{name}`")]
    RecursionLimit { name: String, limit: usize },
    #[error("Invalid argument to `{name}`: {message}")]
    InvalidArgument { name: String, message: String },
    #[error("Failed to write output: {message}")]
    Output { message: String },
    #[error("Operand stack underflow")]
    StackUnderflow,
}

impl RuntimeError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn invalid_argument(name: &str, message: impl Into<String>) -> Self {
        RuntimeError::InvalidArgument {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        RuntimeError::Output {
            message: err.to_string(),
        }
    }
}
