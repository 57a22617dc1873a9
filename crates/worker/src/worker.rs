//! The background worker: one task draining a request queue, running each job
//! on the blocking pool and sending back exactly one response.

use crate::error::{ChannelError, Result};
use crate::job::run_job;
use crate::protocol::{JobRequest, JobResponse};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Executor = Arc<dyn Fn(JobRequest) -> JobResponse + Send + Sync>;

/// Owner side of a running worker
#[derive(Debug)]
pub struct WorkerHandle {
    requests: mpsc::UnboundedSender<JobRequest>,
    responses: mpsc::UnboundedReceiver<JobResponse>,
    task: JoinHandle<()>,
}

/// Start a worker running the decode/merge/export jobs.
///
/// Must be called from within a tokio runtime.
pub fn spawn_worker() -> WorkerHandle {
    spawn_worker_with(run_job)
}

/// Start a worker that runs jobs with `executor`.
pub fn spawn_worker_with<F>(executor: F) -> WorkerHandle
where
    F: Fn(JobRequest) -> JobResponse + Send + Sync + 'static,
{
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(worker_loop(Arc::new(executor), request_rx, response_tx));

    WorkerHandle {
        requests: request_tx,
        responses: response_rx,
        task,
    }
}

async fn worker_loop(
    executor: Executor,
    mut requests: mpsc::UnboundedReceiver<JobRequest>,
    responses: mpsc::UnboundedSender<JobResponse>,
) {
    tracing::debug!("worker started");

    while let Some(request) = requests.recv().await {
        let id = request.id().clone();
        let kind = request.kind();
        tracing::debug!(%id, kind, "job started");

        let exec = Arc::clone(&executor);
        let response = match tokio::task::spawn_blocking(move || exec(request)).await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_panic() {
                    format!("job panicked: {}", panic_message(&*e.into_panic()))
                } else {
                    "job was cancelled".to_string()
                };
                tracing::error!(%id, kind, %error, "job crashed");
                JobResponse::Error { id, error }
            }
        };

        if let Some(error) = response.error_message() {
            tracing::warn!(id = %response.id(), kind, error, "job failed");
        } else {
            tracing::debug!(id = %response.id(), kind, "job complete");
        }

        if responses.send(response).is_err() {
            break;
        }
    }

    tracing::debug!("worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

impl WorkerHandle {
    /// Queue a job; its response arrives through [`WorkerHandle::recv`].
    pub fn submit(&self, request: JobRequest) -> Result<()> {
        self.requests.send(request).map_err(|_| ChannelError::Closed)
    }

    /// Next response, in completion order. `None` once the worker is gone.
    pub async fn recv(&mut self) -> Option<JobResponse> {
        self.responses.recv().await
    }

    /// Stop the worker. A job already running is not reported.
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<JobRequest>,
        mpsc::UnboundedReceiver<JobResponse>,
        JoinHandle<()>,
    ) {
        (self.requests, self.responses, self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JobId;

    fn echo(request: JobRequest) -> JobResponse {
        JobResponse::Error {
            id: request.id().clone(),
            error: "echo".to_string(),
        }
    }

    fn decode_request(id: &str) -> JobRequest {
        JobRequest::Decode {
            id: JobId::from(id),
            data: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_one_response_per_job_in_order() {
        let mut worker = spawn_worker_with(echo);
        for id in ["a", "b", "c"] {
            worker.submit(decode_request(id)).unwrap();
        }

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(worker.recv().await.unwrap().id().to_string());
        }
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_panic_becomes_error_response() {
        let mut worker = spawn_worker_with(|request: JobRequest| {
            if request.id().as_str() == "boom" {
                panic!("kaboom");
            }
            echo(request)
        });

        worker.submit(decode_request("boom")).unwrap();
        worker.submit(decode_request("after")).unwrap();

        let first = worker.recv().await.unwrap();
        assert_eq!(first.id().as_str(), "boom");
        assert_eq!(first.error_message(), Some("job panicked: kaboom"));

        let second = worker.recv().await.unwrap();
        assert_eq!(second.id().as_str(), "after");
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let mut worker = spawn_worker_with(echo);
        worker.shutdown();
        assert!(worker.recv().await.is_none());
        assert_eq!(worker.submit(decode_request("late")), Err(ChannelError::Closed));
    }
}
