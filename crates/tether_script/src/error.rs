use thiserror::Error;

/// Recoverable failures at the script/native boundary.
///
/// Contract violations on the native side are not represented here; they
/// panic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("'{name}' is not a function")]
    NotFunction { name: String },

    #[error("'{name}' raised an error: {message}")]
    FunctionError { name: String, message: String },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("'{name}' does not exist or is not a namespace")]
    VariableDoesntExist { name: String },

    #[error("script '{script}' failed to load: {message}")]
    Load { script: String, message: String },

    #[error("interpreter error: {0}")]
    Engine(String),
}

/// Discriminant of [`ScriptError`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFunction,
    FunctionError,
    TypeMismatch,
    VariableDoesntExist,
    Load,
    Engine,
}

impl ScriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::NotFunction { .. } => ErrorKind::NotFunction,
            ScriptError::FunctionError { .. } => ErrorKind::FunctionError,
            ScriptError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ScriptError::VariableDoesntExist { .. } => ErrorKind::VariableDoesntExist,
            ScriptError::Load { .. } => ErrorKind::Load,
            ScriptError::Engine(_) => ErrorKind::Engine,
        }
    }

    /// Optional hooks a script may omit fail with this kind.
    pub fn is_not_function(&self) -> bool {
        self.kind() == ErrorKind::NotFunction
    }
}
