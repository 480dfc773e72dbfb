//! HTTP surface of the gateway.

mod demo;
mod handler;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info_span, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::gateway::Gateway;

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<Gateway>,
    request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, server: &ServerConfig) -> Self {
        Self {
            gateway,
            request_timeout: server.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handler::root))
        .route("/health", get(handler::health))
        .route("/api/connect/test", post(handler::test_connection))
        .route("/api/query", post(handler::query))
        .route("/api/demo/connection", get(handler::demo_connection_handler))
        .route("/api/demo/queries", get(handler::demo_queries))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Runs blocking gateway work on the blocking pool inside a request span.
/// With a timeout configured the caller stops waiting after it elapses; the
/// engine call itself keeps running until it finishes.
pub(crate) async fn run_blocking<T, F>(
    state: &AppState,
    operation: &'static str,
    work: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Gateway) -> Result<T> + Send + 'static,
{
    let span = info_span!("request", request_id = %Uuid::new_v4(), operation);
    let gateway = Arc::clone(&state.gateway);
    let task_span = span.clone();
    let task = tokio::task::spawn_blocking(move || {
        let _entered = task_span.enter();
        work(&gateway)
    });

    let joined = match state.request_timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(parent: &span, timeout_secs = limit.as_secs(), "Request timed out");
                return Err(Error::RequestTimeout(limit.as_secs()));
            }
        },
        None => task.await,
    };

    joined.map_err(|e| Error::Internal(format!("{} task failed: {}", operation, e)))?
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let detail = if self.is_client_error() {
            self.to_string()
        } else {
            error!(error = %self, status = status.as_u16(), "Request failed");
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                "Internal server error".to_string()
            } else {
                self.to_string()
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
