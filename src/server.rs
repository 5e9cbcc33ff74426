//! HTTP surface for the re-indexer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/reindex` | Re-index one object: `{"name": "docs/a.txt"}` |
//! | `POST` | `/reindex/prefix` | Re-index every object under a prefix: `{"prefix": "docs/"}` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Response Contract
//!
//! `POST /reindex` always answers with the outcome envelope:
//!
//! ```json
//! { "ok": false, "route": "reindex_blob", "error": { "code": "fetch_error", "message": "..." } }
//! ```
//!
//! Status codes follow the error code: `invalid_input` → 400,
//! `fetch_error` / `upsert_error` → 502, success → 200.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::ReindexError;
use crate::ingest::Reindexer;
use crate::models::{Envelope, PrefixReport, ReindexOutcome};

/// Starts the HTTP server on `[server].bind` with the configured store and
/// index. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let reindexer = Reindexer::from_config(config)?;
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "reindex server listening");
    axum::serve(listener, router(reindexer)).await?;

    Ok(())
}

/// Build the application router around a [`Reindexer`].
///
/// Exposed separately from [`run_server`] so callers can mount it in a
/// larger app or drive it in tests.
pub fn router(reindexer: Reindexer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/reindex", post(handle_reindex))
        .route("/reindex/prefix", post(handle_reindex_prefix))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(reindexer)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn list_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "list_error".to_string(),
        message: message.into(),
    }
}

fn invalid_input(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "invalid_input".to_string(),
        message: message.into(),
    }
}

fn status_for(outcome: &ReindexOutcome) -> StatusCode {
    match outcome {
        ReindexOutcome::Failed(err) if err.code() == "invalid_input" => StatusCode::BAD_REQUEST,
        ReindexOutcome::Failed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /reindex ============

#[derive(Deserialize)]
struct ReindexRequest {
    /// Missing is treated the same as empty and reported as `invalid_input`.
    #[serde(default)]
    name: Option<String>,
}

/// A body that is missing, not JSON, or mistyped is answered with the same
/// `invalid_input` envelope as an empty `name`.
async fn handle_reindex(
    State(reindexer): State<Reindexer>,
    body: Result<Json<ReindexRequest>, JsonRejection>,
) -> (StatusCode, Json<Envelope>) {
    let outcome = match body {
        Ok(Json(req)) => reindexer.reindex(&req.name.unwrap_or_default()).await,
        Err(rejection) => ReindexOutcome::Failed(ReindexError::InvalidInput(format!(
            "invalid request body: {}",
            rejection.body_text()
        ))),
    };
    (status_for(&outcome), Json(outcome.to_envelope()))
}

// ============ POST /reindex/prefix ============

#[derive(Deserialize)]
struct PrefixRequest {
    #[serde(default)]
    prefix: String,
}

async fn handle_reindex_prefix(
    State(reindexer): State<Reindexer>,
    body: Result<Json<PrefixRequest>, JsonRejection>,
) -> Result<Json<PrefixReport>, AppError> {
    let Json(req) =
        body.map_err(|r| invalid_input(format!("invalid request body: {}", r.body_text())))?;
    let report = reindexer
        .reindex_prefix(&req.prefix)
        .await
        .map_err(|e| list_error(format!("{:#}", e)))?;
    Ok(Json(report))
}
