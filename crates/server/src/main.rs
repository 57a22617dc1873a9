//! # costmerge-server
//!
//! HTTP front end for the costmerge job channel. Job requests are posted as
//! JSON and answered with the job response JSON.

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use costmerge_worker::{ChannelError, JobClient, JobRequest, JobResponse};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

/// costmerge-server - HTTP API for decode, merge and export jobs
#[derive(Parser)]
#[command(name = "costmerge-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "COSTMERGE_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "COSTMERGE_MAX_BODY_MB", default_value_t = 64)]
    max_body_mb: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Health check response.
#[derive(Serialize, Deserialize)]
pub struct Health {
    /// Server status ("ok" when healthy).
    pub status: String,
    /// Server version from Cargo.toml.
    pub version: String,
}

/// Body of a response that carries no job result.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    client: JobClient,
}

impl AppState {
    pub fn new(client: JobClient) -> Self {
        Self { client }
    }
}

/// Health check endpoint handler.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Run one job and answer with its response.
///
/// Completed jobs answer 200, rejected inputs 422 and crashed or failed
/// exports 500; the body is the job response either way.
pub async fn submit_job(State(state): State<AppState>, Json(request): Json<JobRequest>) -> Response {
    let id = request.id().clone();
    let kind = request.kind();

    match state.client.call(request).await {
        Ok(response) => {
            let status = match &response {
                JobResponse::ProcessComplete { .. } | JobResponse::ExportComplete { .. } => StatusCode::OK,
                JobResponse::ProcessError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                JobResponse::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::info!(%id, kind, status = status.as_u16(), "job answered");
            (status, Json(response)).into_response()
        }
        Err(e) => {
            let status = match e {
                ChannelError::JobFailure { .. } => StatusCode::CONFLICT,
                ChannelError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            };
            tracing::warn!(%id, kind, error = %e, "job not run");
            (status, Json(ErrorBody { error: e.to_string() })).into_response()
        }
    }
}

/// Create the application router.
///
/// This is separated from `main()` to allow testing.
pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/jobs", post(submit_job))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
    }

    let client = JobClient::spawn();
    let app = create_router(AppState::new(client.clone()), cli.max_body_mb * 1024 * 1024);

    let listener = tokio::net::TcpListener::bind(&cli.addr)
        .await
        .with_context(|| format!("Failed to bind {}", cli.addr))?;
    println!("costmerge-server listening on {}", cli.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    client.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TEST_BODY_LIMIT: usize = 1024 * 1024;

    fn app() -> Router {
        create_router(AppState::new(JobClient::spawn()), TEST_BODY_LIMIT)
    }

    fn post_json(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/jobs")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint_body() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let health: Health = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = app()
            .oneshot(Request::builder().uri("/nonexistent").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_merge_job() {
        let response = app()
            .oneshot(post_json(&json!({
                "type": "merge_data",
                "id": "merge",
                "costData": [{"code": "A1", "cost": 5}, {"code": "a1", "cost": 9}],
                "orderData": [{"code": "A1", "amount": 100}, {"code": null, "amount": 3}],
                "costMerchantCodeField": "code",
                "orderMerchantCodeField": "code",
                "costValueField": "cost"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["type"], "process_complete");
        assert_eq!(body["id"], "merge");
        assert_eq!(body["result"]["data"][0]["cost"], 9);
        assert_eq!(body["result"]["data"][1]["cost"], Value::Null);
        assert_eq!(body["result"]["matched"], 1);
        assert_eq!(body["result"]["unmatchedCount"], 1);
    }

    #[tokio::test]
    async fn test_decode_job() {
        let data: Vec<u8> = b"name,price\nWidget,3\n".to_vec();
        let response = app()
            .oneshot(post_json(&json!({"type": "process_excel", "id": "cost_file", "data": data})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["count"], 1);
        assert_eq!(body["result"]["data"][0]["name"], "Widget");
    }

    #[tokio::test]
    async fn test_rejected_input_is_process_error() {
        let response = app()
            .oneshot(post_json(&json!({"type": "process_excel", "id": "order_file", "data": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["type"], "process_error");
        assert_eq!(body["id"], "order_file");
    }

    #[tokio::test]
    async fn test_export_job() {
        let response = app()
            .oneshot(post_json(&json!({
                "type": "export_excel",
                "id": "export",
                "exportData": [{"code": "A1", "cost": 9}],
                "fileName": "result"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["type"], "export_complete");
        assert_eq!(body["exportFormat"], "csv");
        assert_eq!(body["fileName"], "result.csv");
        assert_eq!(body["result"]["rowCount"], 1);
    }

    #[tokio::test]
    async fn test_empty_export_is_error() {
        let response = app()
            .oneshot(post_json(&json!({
                "type": "export_excel",
                "id": "export",
                "exportData": [],
                "exportFormat": "xlsx"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["type"], "error");
    }

    #[tokio::test]
    async fn test_unknown_job_type() {
        let response = app()
            .oneshot(post_json(&json!({"type": "delete_everything", "id": "x"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_closed_channel_is_unavailable() {
        let client = JobClient::spawn();
        client.shutdown();
        let app = create_router(AppState::new(client), TEST_BODY_LIMIT);

        let response = app
            .oneshot(post_json(&json!({"type": "process_excel", "id": "late", "data": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: ErrorBody = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(body.error, "Job channel closed");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["costmerge-server"]);
        assert_eq!(cli.max_body_mb, 64);
        assert!(!cli.verbose);
    }
}
