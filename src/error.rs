use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Every way a sampling or statistics run can fail.
#[derive(Debug, Error)]
pub enum SampleError {
    // -- loading --
    #[error("file does not exist at path: {}", .0.display())]
    NotFound(PathBuf),

    #[error("data file {} contains no rows", .0.display())]
    EmptyData(PathBuf),

    #[error("failed to read {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    // -- validation --
    #[error("column '{0}' does not exist in the data")]
    ColumnNotFound(String),

    #[error("column '{column}' has {count} missing value(s), first at row {first_row}")]
    MissingValue {
        column: String,
        count: usize,
        first_row: usize,
    },

    #[error("invalid sample size {requested}: {reason}")]
    InvalidSampleSize { requested: i64, reason: String },

    #[error("sample size ({requested}) must be at least the number of strata ({classes})")]
    InsufficientSampleSize { requested: usize, classes: usize },

    // -- sampling --
    #[error("sampling failed: {0}")]
    Sampling(String),

    #[error("unexpected sampling failure: {0}")]
    UnknownSampling(String),

    // -- writing --
    #[error("failed to save {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },

    // -- statistics --
    #[error("column '{column}' is not numeric")]
    NotNumeric { column: String },

    #[error("invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("failed to render report: {0}")]
    Render(String),
}

/// Coarse grouping used when reporting a failure to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    InvalidValue,
    Unknown,
}

impl SampleError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SampleError::NotFound(_) => ErrorCategory::NotFound,
            SampleError::EmptyData(_)
            | SampleError::ColumnNotFound(_)
            | SampleError::MissingValue { .. }
            | SampleError::InvalidSampleSize { .. }
            | SampleError::InsufficientSampleSize { .. }
            | SampleError::Sampling(_)
            | SampleError::NotNumeric { .. }
            | SampleError::InvalidQuery { .. } => ErrorCategory::InvalidValue,
            SampleError::Load { .. }
            | SampleError::UnknownSampling(_)
            | SampleError::Save { .. }
            | SampleError::Render(_) => ErrorCategory::Unknown,
        }
    }

    /// The message printed by the CLI: the error plus a hint for its category.
    pub fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::NotFound => {
                format!("error: {self}. Please check the file path.")
            }
            ErrorCategory::InvalidValue => {
                format!("error: {self}. Please check the input values.")
            }
            ErrorCategory::Unknown => {
                format!("unexpected error: {self}. Please check and try again.")
            }
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::NotFound => write!(f, "not-found"),
            ErrorCategory::InvalidValue => write!(f, "invalid-value"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

pub type Result<T, E = SampleError> = std::result::Result<T, E>;
