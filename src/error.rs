//! Error types for the AutoNet framework

use thiserror::Error;

/// Result type alias for AutoNet operations
pub type Result<T> = std::result::Result<T, AutoNetError>;

/// Coarse classification of an error, used by callers that only care about
/// which family a failure belongs to (bad value, wrong type, broken
/// precondition, ordering mistake, or a runtime failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Value,
    Type,
    Assertion,
    NotFitted,
    Runtime,
    Io,
}

/// Main error type for the AutoNet framework
#[derive(Error, Debug)]
pub enum AutoNetError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema drift: fit() was called with {expected} whereas the new features have {actual}")]
    SchemaDrift { expected: String, actual: String },

    #[error("Unsupported type in column {column}: {detail}")]
    UnsupportedType { column: String, detail: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Dataset properties must contain `{0}`")]
    MissingDatasetProperty(String),

    #[error("Missing hyperparameter: {0}")]
    MissingHyperparameter(String),

    #[error("Not fitted: {0}")]
    NotFitted(String),

    #[error("Empty search result: {0}")]
    EmptySearchResult(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AutoNetError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_fitted(msg: impl Into<String>) -> Self {
        Self::NotFitted(msg.into())
    }

    /// Family this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            AutoNetError::Configuration(_)
            | AutoNetError::SchemaDrift { .. }
            | AutoNetError::UnsupportedType { .. }
            | AutoNetError::InvalidInput(_)
            | AutoNetError::MissingHyperparameter(_)
            | AutoNetError::Data(_)
            | AutoNetError::Shape { .. }
            | AutoNetError::Serialization(_) => ErrorKind::Value,
            AutoNetError::TypeMismatch { .. } => ErrorKind::Type,
            AutoNetError::MissingDatasetProperty(_) => ErrorKind::Assertion,
            AutoNetError::NotFitted(_) => ErrorKind::NotFitted,
            AutoNetError::EmptySearchResult(_) | AutoNetError::Training(_) => ErrorKind::Runtime,
            AutoNetError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether retrying the same configuration could ever succeed
    pub fn is_permanent(&self) -> bool {
        matches!(self.kind(), ErrorKind::Value | ErrorKind::Type | ErrorKind::Assertion)
    }
}

impl From<polars::error::PolarsError> for AutoNetError {
    fn from(err: polars::error::PolarsError) -> Self {
        AutoNetError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for AutoNetError {
    fn from(err: serde_json::Error) -> Self {
        AutoNetError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AutoNetError {
    fn from(err: ndarray::ShapeError) -> Self {
        AutoNetError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
