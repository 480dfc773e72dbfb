use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::warn;

use super::demo::{demo_connection, DEMO_QUERIES};
use super::types::{
    DemoConnectionResponse, DemoQueriesResponse, HealthResponse, QueryRequest, RootResponse,
    TestConnectionRequest, TestConnectionResponse,
};
use super::{run_blocking, AppState};
use crate::domain::{ExecutionResult, RowLimit};
use crate::error::{Error, Result};

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Cloudfloe API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine_version = match run_blocking(&state, "health", |gateway| gateway.engine_version()).await
    {
        Ok(version) => Some(version),
        Err(e) => {
            warn!(error = %e, "Engine version unavailable");
            None
        }
    };
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    Json(HealthResponse {
        status: "healthy",
        engine: state.gateway.engine_name(),
        engine_version,
        timestamp,
    })
}

pub async fn test_connection(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TestConnectionRequest>, JsonRejection>,
) -> Result<Json<TestConnectionResponse>> {
    let Json(request) = payload.map_err(rejection)?;
    let connection = request.connection;

    let outcome = run_blocking(&state, "connect_test", move |gateway| {
        Ok(gateway.test_connection(&connection))
    })
    .await?;

    if !outcome.ok {
        return Err(Error::ConnectionTestFailed);
    }
    Ok(Json(TestConnectionResponse {
        status: "success",
        message: "Connection successful",
        table_info: outcome.table_info,
    }))
}

pub async fn query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ExecutionResult>> {
    let Json(request) = payload.map_err(rejection)?;
    let row_limit = RowLimit::new(request.row_limit)?;

    // Rejected SQL never reaches the blocking pool or the engine.
    state.gateway.screen(&request.sql)?;

    let QueryRequest {
        sql, connection, ..
    } = request;
    let result = run_blocking(&state, "query", move |gateway| {
        gateway.run_query(&sql, &connection, row_limit)
    })
    .await?;
    Ok(Json(result))
}

pub async fn demo_connection_handler() -> Json<DemoConnectionResponse> {
    Json(demo_connection())
}

pub async fn demo_queries() -> Json<DemoQueriesResponse> {
    Json(DemoQueriesResponse {
        queries: &DEMO_QUERIES,
    })
}

fn rejection(err: JsonRejection) -> Error {
    Error::InvalidRequest(err.body_text())
}
