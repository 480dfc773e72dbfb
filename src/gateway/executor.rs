use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use super::rewrite::rewrite_query;
use super::session::SessionBuilder;
use super::validator::validate_table;
use crate::domain::{ExecutionResult, QueryPlanFragment, RowLimit, StorageConfig};
use crate::engine::QueryResult;
use crate::error::{Error, Result};
use crate::metrics::{
    record_query_duration, record_query_failed, record_query_started, record_rows_returned,
};

/// Runs one caller query end to end on a fresh session. Single shot, no
/// retries, no partial results.
pub struct QueryExecutor {
    sessions: Arc<SessionBuilder>,
}

impl QueryExecutor {
    pub fn new(sessions: Arc<SessionBuilder>) -> Self {
        Self { sessions }
    }

    pub fn execute(
        &self,
        sql: &str,
        config: &StorageConfig,
        row_limit: RowLimit,
    ) -> Result<ExecutionResult> {
        let start = Instant::now();
        record_query_started();

        let outcome = self.run(sql, config, row_limit);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        record_query_duration(start);

        match outcome {
            Ok((result, warnings)) => {
                record_rows_returned(result.rows.len());
                info!(
                    rows = result.rows.len(),
                    elapsed_ms,
                    storage_type = %config.storage_type,
                    "Query completed"
                );
                Ok(ExecutionResult::new(
                    result.columns,
                    result.rows,
                    elapsed_ms,
                    row_limit,
                    warnings,
                ))
            }
            Err(e) => {
                record_query_failed();
                error!(elapsed_ms, error = %e, "Query failed");
                Err(into_execution_error(e, elapsed_ms))
            }
        }
    }

    fn run(
        &self,
        sql: &str,
        config: &StorageConfig,
        row_limit: RowLimit,
    ) -> Result<(QueryResult, Vec<String>)> {
        let session = self.sessions.build(config)?;

        let mut warnings = Vec::new();
        if let Some(path) = config.table_path() {
            warnings.extend(validate_table(&session, path)?.warnings);
        }

        session.enable_profiling()?;

        let fragment = QueryPlanFragment::new(sql, row_limit);
        let rewritten = rewrite_query(&fragment, session.catalog());
        debug!(sql = rewritten.sql(), "Executing rewritten query");

        let result = session.query(rewritten.sql())?;
        Ok((result, warnings))
    }
}

fn into_execution_error(err: Error, elapsed_ms: u64) -> Error {
    match err {
        Error::InvalidConfiguration(_)
        | Error::IncompatibleTable(_)
        | Error::CapabilityUnavailable(_) => err,
        Error::Engine(message) => Error::Execution {
            elapsed_ms,
            message,
        },
        other => Error::Execution {
            elapsed_ms,
            message: other.to_string(),
        },
    }
}
