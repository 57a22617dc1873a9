use crate::protocol::JobId;
use thiserror::Error;

/// Errors seen by callers of the job channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The job ran and failed; `message` is the failure reported by the worker.
    #[error("Job '{id}' failed: {message}")]
    JobFailure { id: JobId, message: String },

    /// The worker is gone; no response will arrive.
    #[error("Job channel closed")]
    Closed,
}

impl ChannelError {
    pub fn failure(id: JobId, message: impl Into<String>) -> Self {
        Self::JobFailure {
            id,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
