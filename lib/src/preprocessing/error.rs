//! Error types for dataset and preprocessing operations.

use thiserror::Error;

/// Error type shared by the view converter, the dataset and every preprocessor.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    /// Design matrix and topological view disagree on their shape.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
    /// Patch geometry does not tile the spatial extent it is applied to.
    #[error("Geometry error: {0}")]
    Geometry(String),
    /// A transform produced NaN or Inf from finite input.
    #[error("Numeric guard violated: {transform} produced non-finite output")]
    NumericGuardViolation { transform: &'static str },
    /// Data handed to a transform already contains NaN or Inf.
    #[error("Non-finite input: {0}")]
    NonFiniteInput(String),
    /// Invalid hyperparameter value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Axis descriptor failed validation.
    #[error("Invalid axes: {0}")]
    InvalidAxes(String),
    /// Topological access on a dataset that has no view converter.
    #[error("Dataset has no topological view converter")]
    MissingTopology,
    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PreprocessingError {
    pub(crate) fn shape_mismatch(expected: impl std::fmt::Debug, got: impl std::fmt::Debug) -> Self {
        PreprocessingError::ShapeMismatch {
            expected: format!("{:?}", expected),
            got: format!("{:?}", got),
        }
    }
}

impl From<bincode::Error> for PreprocessingError {
    fn from(err: bincode::Error) -> Self {
        PreprocessingError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PreprocessingError {
    fn from(err: serde_json::Error) -> Self {
        PreprocessingError::Serialization(err.to_string())
    }
}
