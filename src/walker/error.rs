use thiserror::Error;
use super::heap::HeapError;

/// A dynamic error raised while evaluating a program.
///
/// Errors travel through `Result` inside the evaluator and become `Value::Error` at the program
/// boundary; the `Display` text is the message that value carries. Variants that name an
/// expression hold its rendered source.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EvalError {
    #[error("No binding found for name: {0}")]
    Unbound(String),
    #[error("Operator not a function in call {0}")]
    NotAFunction(String),
    #[error("Argument mismatch in call {0}")]
    ArgumentMismatch(String),
    #[error("Condition not a boolean in expression {0}")]
    NotABoolean(String),
    #[error("Operand not a number in expression {0}")]
    NotANumber(String),
    #[error("Argument not a pair in expression {0}")]
    NotAPair(String),
    #[error("Argument not a reference in expression {0}")]
    NotAReference(String),
    #[error("Argument not a string in expression {0}")]
    NotAString(String),

    #[error(transparent)]
    Heap(#[from] HeapError),

    #[error("Error: Array sizes are not ints.")]
    ArraySizeNotInt,
    #[error("Error: Array sizes cannot be negative.")]
    ArraySizeNotPositive,
    #[error("Error: First argument must be an array.")]
    NotAnArray,
    #[error("Error: An empty array has no elements to index.")]
    EmptyArray,
    #[error("Error: Array indices should be positive integers.")]
    IndexNotPositiveInt,
    #[error("Error: Array indices should be integers.")]
    IndexNotInt,
    #[error("Error: Indices must be positive.")]
    IndexNotPositive,
    #[error("Error: Indices should not exceed their relevant array size.")]
    IndexOutOfBounds,
    #[error("Error: Too many or too few indices for this array.")]
    WrongIndexCount,
    #[error("Error: Current functionality allows only numeric arrays.")]
    NonNumericArrayValue,

    #[error("Could not read file '{path}': {message}")]
    Io { path: String, message: String },
    #[error("Syntax error in evaluated code: {0}")]
    Syntax(String),
}
