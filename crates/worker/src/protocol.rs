//! Job request/response messages.
//!
//! Messages are tagged unions keyed by `type` with camelCase fields, so the
//! same values travel over the in-process channel and as JSON over HTTP.

use costmerge_core::JoinResult;
use costmerge_sheet::{Dataset, ExportFormat};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-chosen identifier correlating a request with its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A unit of work for the background worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobRequest {
    /// Decode raw spreadsheet bytes
    #[serde(rename = "process_excel")]
    Decode { id: JobId, data: Vec<u8> },

    /// Join a cost dataset into an order dataset
    #[serde(rename = "merge_data", rename_all = "camelCase")]
    Merge {
        id: JobId,
        cost_data: Dataset,
        order_data: Dataset,
        cost_merchant_code_field: String,
        order_merchant_code_field: String,
        cost_value_field: String,
    },

    /// Encode a dataset for download
    #[serde(rename = "export_excel", rename_all = "camelCase")]
    Export {
        id: JobId,
        export_data: Dataset,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(default)]
        export_format: ExportFormat,
        /// Rows per encoder batch; the encoder default when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        batch_size: Option<usize>,
    },
}

impl JobRequest {
    #[must_use]
    pub fn id(&self) -> &JobId {
        match self {
            JobRequest::Decode { id, .. } | JobRequest::Merge { id, .. } | JobRequest::Export { id, .. } => id,
        }
    }

    /// Message type name as it appears on the wire
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            JobRequest::Decode { .. } => "process_excel",
            JobRequest::Merge { .. } => "merge_data",
            JobRequest::Export { .. } => "export_excel",
        }
    }
}

/// Decoded sheet with its row count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSheet {
    pub data: Dataset,
    pub count: usize,
}

/// Payload of a `process_complete` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessOutput {
    Merged(JoinResult),
    Decoded(DecodedSheet),
}

/// Encoded bytes of an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutput {
    pub data: Vec<u8>,
    pub row_count: usize,
}

/// Exactly one of these is produced per request, carrying the request's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobResponse {
    /// A decode or merge finished
    ProcessComplete { id: JobId, result: ProcessOutput },

    /// A decode or merge was rejected
    ProcessError { id: JobId, error: String },

    /// An export finished
    #[serde(rename_all = "camelCase")]
    ExportComplete {
        id: JobId,
        result: ExportOutput,
        file_name: String,
        export_format: ExportFormat,
    },

    /// An export failed or the job crashed
    Error { id: JobId, error: String },
}

impl JobResponse {
    #[must_use]
    pub fn id(&self) -> &JobId {
        match self {
            JobResponse::ProcessComplete { id, .. }
            | JobResponse::ProcessError { id, .. }
            | JobResponse::ExportComplete { id, .. }
            | JobResponse::Error { id, .. } => id,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, JobResponse::ProcessError { .. } | JobResponse::Error { .. })
    }

    /// Error message of a failed job.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            JobResponse::ProcessError { error, .. } | JobResponse::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}
