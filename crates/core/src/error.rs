//! Error types for the join engine and merge session.

use thiserror::Error;

/// Errors raised by [`crate::merge`].
#[derive(Debug, Error)]
pub enum JoinError {
    /// Empty dataset or blank column name.
    #[error("Invalid merge parameters: {0}")]
    InvalidParameters(String),
}

impl JoinError {
    /// Create an invalid-parameters error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }
}

/// Errors raised by [`crate::MergeSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Row id does not address a row of the current result.
    #[error("Row {row} not found (result has {count} rows)")]
    UnknownRow { row: usize, count: usize },

    /// No merge result has been applied yet.
    #[error("No merge result available")]
    NoResult,

    /// A dataset slot has not been filled.
    #[error("The {0} dataset has not been loaded")]
    MissingDataset(&'static str),

    /// Value column names are not set.
    #[error("Merge columns not selected: {0}")]
    MissingColumn(&'static str),
}
