//! Query execution gateway: per-request sessions, table validation, query
//! rewriting, execution and connection probes.

mod executor;
pub mod rewrite;
mod session;
mod tester;
mod validator;

pub use self::executor::QueryExecutor;
pub use self::session::{Session, SessionBuilder, CATALOG_ALIAS};
pub use self::tester::{ConnectionTestOutcome, ConnectionTester};
pub use self::validator::validate_table;

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::domain::{ExecutionResult, RowLimit, StorageConfig};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::metrics::record_query_rejected;
use crate::validation::check_sql;

/// Entry point used by the HTTP layer. Every method blocks on the engine.
pub struct Gateway {
    sessions: Arc<SessionBuilder>,
    executor: QueryExecutor,
    tester: ConnectionTester,
}

impl Gateway {
    pub fn new(engine: Arc<dyn Engine>, config: &Config) -> Self {
        let sessions = Arc::new(SessionBuilder::new(
            engine,
            config.engine.clone(),
            config.storage.clone(),
        ));
        Self {
            executor: QueryExecutor::new(Arc::clone(&sessions)),
            tester: ConnectionTester::new(
                Arc::clone(&sessions),
                config.storage.demo_table_path.clone(),
            ),
            sessions,
        }
    }

    /// Loads both engine capabilities once. The server refuses to start
    /// when this fails.
    pub fn preflight(&self) -> Result<()> {
        self.sessions
            .preflight()
            .map_err(|e| e.with_context("preflight"))?;
        info!(engine = self.engine_name(), "Engine capabilities available");
        Ok(())
    }

    pub fn engine_name(&self) -> &'static str {
        self.sessions.engine().name()
    }

    pub fn engine_version(&self) -> Result<String> {
        self.sessions.engine().version()
    }

    /// Rejects empty and mutating SQL. Runs before any session exists.
    pub fn screen(&self, sql: &str) -> Result<()> {
        check_sql(sql).inspect_err(|e| {
            let reason = match e {
                Error::EmptyQuery => "empty".to_string(),
                Error::DestructiveOperation(keyword) => keyword.to_lowercase(),
                other => other.to_string(),
            };
            record_query_rejected(&reason);
            info!(reason = %reason, "Query rejected");
        })
    }

    /// Runs SQL that already passed [`Gateway::screen`].
    pub fn run_query(
        &self,
        sql: &str,
        config: &StorageConfig,
        row_limit: RowLimit,
    ) -> Result<ExecutionResult> {
        self.executor.execute(sql, config, row_limit)
    }

    pub fn execute_query(
        &self,
        sql: &str,
        config: &StorageConfig,
        row_limit: RowLimit,
    ) -> Result<ExecutionResult> {
        self.screen(sql)?;
        self.run_query(sql, config, row_limit)
    }

    pub fn test_connection(&self, config: &StorageConfig) -> ConnectionTestOutcome {
        self.tester.test_detailed(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StorageKind;
    use crate::engine::{Capability, ScriptedEngine};
    use serde_json::json;

    fn gateway(engine: &ScriptedEngine) -> Gateway {
        Gateway::new(Arc::new(engine.clone()), &Config::default())
    }

    fn s3_config() -> StorageConfig {
        StorageConfig::new(StorageKind::GenericS3, "example.com", "AKIA", "secret")
            .with_region("us-west-2")
    }

    #[test]
    fn test_execute_select_one() {
        let engine = ScriptedEngine::new();
        engine.respond("SELECT 1", &["1"], vec![vec![json!(1)]]);

        let result = gateway(&engine)
            .execute_query("SELECT 1", &s3_config(), RowLimit::default())
            .unwrap();
        assert_eq!(result.columns, vec!["1"]);
        assert_eq!(result.rows, vec![vec![json!(1)]]);
        assert!(!result.truncated);
    }

    #[test]
    fn test_delete_rejected_before_session() {
        let engine = ScriptedEngine::new();
        let result =
            gateway(&engine).execute_query("DELETE FROM t", &s3_config(), RowLimit::default());

        assert!(matches!(result, Err(Error::DestructiveOperation("DELETE"))));
        assert_eq!(engine.sessions_opened(), 0);
        assert!(engine.recorded().is_empty());
    }

    #[test]
    fn test_empty_query_rejected() {
        let engine = ScriptedEngine::new();
        let result = gateway(&engine).execute_query("  ", &s3_config(), RowLimit::default());
        assert!(matches!(result, Err(Error::EmptyQuery)));
        assert_eq!(engine.sessions_opened(), 0);
    }

    #[test]
    fn test_preflight() {
        let engine = ScriptedEngine::new();
        assert!(gateway(&engine).preflight().is_ok());

        let engine = ScriptedEngine::new();
        engine.without_capability(Capability::TableFormat);
        match gateway(&engine).preflight() {
            Err(Error::CapabilityUnavailable(msg)) => assert!(msg.contains("[op=preflight]")),
            other => panic!("Expected CapabilityUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_identity() {
        let engine = ScriptedEngine::new();
        let gateway = gateway(&engine);
        assert_eq!(gateway.engine_name(), "scripted");
        assert!(gateway.engine_version().is_ok());
    }

    #[test]
    fn test_connection_uses_configured_demo_path() {
        let engine = ScriptedEngine::new();
        let mut config = Config::default();
        config.storage.demo_table_path = "s3://samples/trips".to_string();
        let gateway = Gateway::new(Arc::new(engine.clone()), &config);

        assert!(gateway.test_connection(&s3_config()).ok);
        assert!(engine
            .executed_sql()
            .iter()
            .any(|sql| sql.contains("read_parquet('s3://samples/trips/**/*.parquet')")));
    }
}
