//! Request/response correlation on top of a [`WorkerHandle`].

use crate::error::{ChannelError, Result};
use crate::protocol::{DecodedSheet, ExportOutput, JobId, JobRequest, JobResponse, ProcessOutput};
use crate::worker::{spawn_worker, WorkerHandle};
use costmerge_core::{JoinResult, MergeColumns};
use costmerge_sheet::{Dataset, ExportFormat};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Callers waiting for a response, by job id. `None` once the client is shut down.
type Pending = Arc<Mutex<Option<HashMap<JobId, oneshot::Sender<JobResponse>>>>>;

/// A finished export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub data: Vec<u8>,
    pub row_count: usize,
    pub file_name: String,
    pub format: ExportFormat,
}

/// Cloneable handle that turns each job into a future resolving with the
/// response carrying the same id.
#[derive(Debug, Clone)]
pub struct JobClient {
    requests: mpsc::UnboundedSender<JobRequest>,
    pending: Pending,
    tasks: Arc<[JoinHandle<()>; 2]>,
}

impl JobClient {
    /// Start a worker and a dispatcher for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn() -> Self {
        Self::from_worker(spawn_worker())
    }

    /// Take over an already running worker.
    pub fn from_worker(worker: WorkerHandle) -> Self {
        let (requests, responses, worker_task) = worker.into_parts();
        let pending: Pending = Arc::new(Mutex::new(Some(HashMap::new())));
        let dispatcher = tokio::spawn(dispatch(responses, Arc::clone(&pending)));

        Self {
            requests,
            pending,
            tasks: Arc::new([worker_task, dispatcher]),
        }
    }

    /// Submit `request` and wait for its response.
    ///
    /// Failed jobs still resolve `Ok` with a `process_error` or `error`
    /// response; use the typed helpers to get them as [`ChannelError`].
    pub async fn call(&self, request: JobRequest) -> Result<JobResponse> {
        let id = request.id().clone();
        let (tx, rx) = oneshot::channel();

        {
            let mut guard = lock(&self.pending);
            let pending = guard.as_mut().ok_or(ChannelError::Closed)?;
            if pending.contains_key(&id) {
                return Err(ChannelError::failure(id, "a job with this id is already running"));
            }
            pending.insert(id.clone(), tx);
        }

        if self.requests.send(request).is_err() {
            if let Some(pending) = lock(&self.pending).as_mut() {
                pending.remove(&id);
            }
            return Err(ChannelError::Closed);
        }

        rx.await.map_err(|_| ChannelError::Closed)
    }

    /// Decode spreadsheet bytes.
    pub async fn decode(&self, id: JobId, data: Vec<u8>) -> Result<DecodedSheet> {
        match self.call(JobRequest::Decode { id, data }).await? {
            JobResponse::ProcessComplete {
                result: ProcessOutput::Decoded(sheet),
                ..
            } => Ok(sheet),
            other => Err(unexpected(other)),
        }
    }

    /// Join `cost` into `order`.
    pub async fn merge(&self, id: JobId, cost: Dataset, order: Dataset, columns: MergeColumns) -> Result<JoinResult> {
        let request = JobRequest::Merge {
            id,
            cost_data: cost,
            order_data: order,
            cost_merchant_code_field: columns.cost_key,
            order_merchant_code_field: columns.order_key,
            cost_value_field: columns.value,
        };
        match self.call(request).await? {
            JobResponse::ProcessComplete {
                result: ProcessOutput::Merged(result),
                ..
            } => Ok(result),
            other => Err(unexpected(other)),
        }
    }

    /// Encode `data` as `format`, `batch_size` rows at a time.
    pub async fn export(
        &self,
        id: JobId,
        data: Dataset,
        file_name: Option<String>,
        format: ExportFormat,
        batch_size: Option<usize>,
    ) -> Result<ExportedFile> {
        let request = JobRequest::Export {
            id,
            export_data: data,
            file_name,
            export_format: format,
            batch_size,
        };
        match self.call(request).await? {
            JobResponse::ExportComplete {
                result: ExportOutput { data, row_count },
                file_name,
                export_format,
                ..
            } => Ok(ExportedFile {
                data,
                row_count,
                file_name,
                format: export_format,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Stop the worker. Pending and later calls fail with [`ChannelError::Closed`].
    pub fn shutdown(&self) {
        lock(&self.pending).take();
        for task in self.tasks.iter() {
            task.abort();
        }
        tracing::debug!("job client shut down");
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.pending).is_none()
    }
}

async fn dispatch(mut responses: mpsc::UnboundedReceiver<JobResponse>, pending: Pending) {
    while let Some(response) = responses.recv().await {
        let waiter = lock(&pending)
            .as_mut()
            .and_then(|waiting| waiting.remove(response.id()));
        match waiter {
            Some(tx) => {
                // Caller may have stopped waiting
                let _ = tx.send(response);
            }
            None => tracing::warn!(id = %response.id(), "dropping response nobody is waiting for"),
        }
    }
    lock(&pending).take();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unexpected(response: JobResponse) -> ChannelError {
    let message = response
        .error_message()
        .map_or_else(|| "unexpected response type".to_string(), str::to_string);
    ChannelError::failure(response.id().clone(), message)
}
