//! # costmerge-worker
//!
//! Background execution channel for costmerge. Decode, merge and export run
//! as one-shot jobs on a dedicated worker so the caller's async task never
//! blocks on spreadsheet work.
//!
//! ## Example
//! ```no_run
//! use costmerge_worker::{JobClient, JobId};
//!
//! # async fn run(bytes: Vec<u8>) -> costmerge_worker::Result<()> {
//! let client = JobClient::spawn();
//! let sheet = client.decode(JobId::from("cost_file"), bytes).await?;
//! println!("{} rows", sheet.count);
//! client.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod job;
pub mod protocol;
pub mod worker;

pub use client::{ExportedFile, JobClient};
pub use error::{ChannelError, Result};
pub use job::run_job;
pub use protocol::{DecodedSheet, ExportOutput, JobId, JobRequest, JobResponse, ProcessOutput};
pub use worker::{spawn_worker, spawn_worker_with, WorkerHandle};
