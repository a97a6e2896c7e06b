use thiserror::Error;

use crate::lexer::Token;

pub fn source_location(sample: String, line: usize, column: usize) -> SourceLocation {
    SourceLocation { sample, line, column }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    sample: String,
    line: usize,
    column: usize,
}

impl SourceLocation {
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

impl std::error::Error for SourceLocation {}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "'{}' at line {}, column {}", &self.sample, self.line, self.column)
    }
}

/// Every failure the toolchain can report, grouped by the phase which raised it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FoxError {
    #[error("Syntax error {location}: {message}\n  advice: {advice}")]
    Syntax {
        location: SourceLocation,
        message: String,
        advice: String,
    },

    #[error("Resolution error {location}: {message}\n  advice: {advice}")]
    Resolve {
        location: SourceLocation,
        message: String,
        advice: String,
    },

    #[error("Runtime error {location}: {error}")]
    Runtime {
        location: SourceLocation,
        error: RuntimeError,
    },

    #[error("{message}\n  advice: {advice}")]
    System {
        message: String,
        advice: String,
    },
}

impl FoxError {
    /// Syntax and resolution failures are found before anything is evaluated.
    pub fn is_static(&self) -> bool {
        matches!(self, FoxError::Syntax { .. } | FoxError::Resolve { .. })
    }

    pub fn description(&self) -> String {
        match self {
            FoxError::Syntax { message, .. } | FoxError::Resolve { message, .. } | FoxError::System { message, .. } => message.clone(),
            FoxError::Runtime { error, .. } => error.to_string(),
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            FoxError::Syntax { location, .. } | FoxError::Resolve { location, .. } | FoxError::Runtime { location, .. } => Some(location),
            FoxError::System { .. } => None,
        }
    }

    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        match self {
            FoxError::Runtime { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// The typed failures raised while evaluating an expression tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Operand must be a number, but got {0}.")]
    OperandNotNumber(String),

    #[error("Operands must be numbers, but got {0} and {1}.")]
    OperandsNotNumbers(String, String),

    #[error("Operands must be two numbers, or at least one of them a string, but got {0} and {1}.")]
    InvalidAddition(String, String),

    #[error("Cannot divide by zero.")]
    DivideByZero,

    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Can only invoke functions, but got {0}.")]
    NotCallable(String),

    #[error("Expected {expected} arguments but got {got}.")]
    Arity { expected: usize, got: usize },

    #[error("Can only access arrays using `[]` syntax, but got {0}.")]
    NotAnArray(String),

    #[error("Cannot access an empty array.")]
    EmptyArray,

    #[error("Index expression didn't result in a valid index value: '{0}'.")]
    InvalidIndex(String),

    #[error("Array index out of bounds '{0}'.")]
    IndexOutOfBounds(i64),

    #[error("Array upper bound out of bounds '{0}'.")]
    UpperBoundOutOfBounds(i64),

    #[error("Array index '{lower}' is greater than the upper bound '{upper}'.")]
    InvertedSlice { lower: i64, upper: i64 },

    #[error("Break expressions are only valid inside loops.")]
    BreakOutsideLoop,

    #[error("Something went wrong trying to import '{path}': {reason}")]
    Import { path: String, reason: String },

    #[error("Something went wrong evaluating the provided source: {0}")]
    Eval(String),

    #[error("{0}")]
    Native(String),
}

pub fn syntax<M: Into<String>, A: Into<String>>(token: &Token, message: M, advice: A) -> FoxError {
    FoxError::Syntax {
        location: token.location(),
        message: message.into(),
        advice: advice.into(),
    }
}

pub fn syntax_at<M: Into<String>, A: Into<String>>(location: SourceLocation, message: M, advice: A) -> FoxError {
    FoxError::Syntax {
        location,
        message: message.into(),
        advice: advice.into(),
    }
}

pub fn resolve<M: Into<String>, A: Into<String>>(token: &Token, message: M, advice: A) -> FoxError {
    FoxError::Resolve {
        location: token.location(),
        message: message.into(),
        advice: advice.into(),
    }
}

pub fn runtime(token: &Token, error: RuntimeError) -> FoxError {
    FoxError::Runtime {
        location: token.location(),
        error,
    }
}

pub fn system<M: Into<String>, A: Into<String>>(message: M, advice: A) -> FoxError {
    FoxError::System {
        message: message.into(),
        advice: advice.into(),
    }
}

impl From<std::io::Error> for FoxError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => system(
                format!("We could not find the file you provided ({}).", e),
                "Make sure that the file exists and that you have permissions to access it.",
            ),
            std::io::ErrorKind::PermissionDenied => system(
                format!("You do not have permissions to access the file you provided ({}).", e),
                "Make sure that you have permissions to access the file.",
            ),
            std::io::ErrorKind::InvalidData => system(
                "The file you provided is not a valid UTF-8 file.",
                "Make sure that the file is a valid UTF-8 file.",
            ),
            kind => system(
                format!("We were unable to complete an I/O operation due to a {} error ({}).", kind, e),
                "Check the internal error message and try searching for a solution online.",
            ),
        }
    }
}
