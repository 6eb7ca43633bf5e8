// HTTP Surface
//
// Exposes the history store over two routes, mounted both at `/history`
// and `/api/history`:
//   GET  -> the full log as a JSON array
//   POST -> append one record, echo it back with 201

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::FailurePolicy;
use crate::log::{HistoryLog, HistoryRecord, HistoryStore, StoreError};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn HistoryStore>,
    policy: FailurePolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn HistoryStore>, policy: FailurePolicy) -> Self {
        Self { store, policy }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "history request failed");
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let history = get(list_history).post(append_history);

    Router::new()
        .route("/history", history.clone())
        .route("/api/history", history)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_history(State(state): State<AppState>) -> Result<Json<HistoryLog>, ApiError> {
    let AppState { store, policy } = state;

    let log = tokio::task::spawn_blocking(move || match policy {
        FailurePolicy::Lenient => Ok(store.load()),
        FailurePolicy::Strict => store.try_load(),
    })
    .await??;

    Ok(Json(log))
}

async fn append_history(
    State(state): State<AppState>,
    Json(record): Json<HistoryRecord>,
) -> Result<(StatusCode, Json<HistoryRecord>), ApiError> {
    let AppState { store, policy } = state;
    let record = record.with_default_title();
    let stored = record.clone();

    tokio::task::spawn_blocking(move || match policy {
        FailurePolicy::Lenient => {
            store.append(record);
            Ok(())
        }
        FailurePolicy::Strict => store.try_append(record),
    })
    .await??;

    Ok((StatusCode::CREATED, Json(stored)))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed = ?started.elapsed(),
        "request handled"
    );
    response
}
