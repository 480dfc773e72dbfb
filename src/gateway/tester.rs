use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::session::{Session, SessionBuilder, CATALOG_ALIAS};
use crate::domain::{StorageConfig, TableInfo, TableTarget};
use crate::error::Result;
use crate::metrics::record_connection_test;
use crate::validation::quote_literal;

const PROBE_SAMPLE_ROWS: u32 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTestOutcome {
    pub ok: bool,
    pub table_info: Option<TableInfo>,
}

/// Builds a session like a query would and runs a probe instead of caller
/// SQL. Failures are logged for operators and reported as `false`.
pub struct ConnectionTester {
    sessions: Arc<SessionBuilder>,
    demo_table_path: String,
}

impl ConnectionTester {
    pub fn new(sessions: Arc<SessionBuilder>, demo_table_path: impl Into<String>) -> Self {
        Self {
            sessions,
            demo_table_path: demo_table_path.into(),
        }
    }

    pub fn test(&self, config: &StorageConfig) -> bool {
        self.test_detailed(config).ok
    }

    pub fn test_detailed(&self, config: &StorageConfig) -> ConnectionTestOutcome {
        match self.probe(config) {
            Ok(table_info) => {
                record_connection_test(true);
                info!(storage_type = %config.storage_type, "Connection test succeeded");
                ConnectionTestOutcome {
                    ok: true,
                    table_info,
                }
            }
            Err(e) => {
                record_connection_test(false);
                warn!(storage_type = %config.storage_type, error = %e, "Connection test failed");
                ConnectionTestOutcome {
                    ok: false,
                    table_info: None,
                }
            }
        }
    }

    fn probe(&self, config: &StorageConfig) -> Result<Option<TableInfo>> {
        let target = config.target()?;
        let session = self.sessions.build(config)?;

        match target {
            TableTarget::Catalog(catalog) => {
                let result = session.query(&format!(
                    "SELECT table_name FROM information_schema.tables WHERE table_catalog = {} AND table_schema = {}",
                    quote_literal(CATALOG_ALIAS),
                    quote_literal(&catalog.namespace)
                ))?;
                let tables = result
                    .rows
                    .iter()
                    .filter_map(|row| row.first().and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                Ok(Some(TableInfo::Catalog {
                    namespace: catalog.namespace,
                    tables,
                }))
            }
            TableTarget::Path(path) => {
                let version_hint = read_version_hint(&session, &path);
                let sampled_rows =
                    sample_rows(&session, &format!("iceberg_scan({})", quote_literal(&path)))?;
                Ok(Some(TableInfo::Path {
                    path,
                    version_hint,
                    sampled_rows,
                }))
            }
            TableTarget::Demo => {
                sample_rows(&session, &demo_scan(&self.demo_table_path))?;
                Ok(None)
            }
        }
    }
}

/// Best effort. Tables written without a hint file are still readable.
fn read_version_hint(session: &Session, path: &str) -> Option<String> {
    let hint = format!("{}/metadata/version-hint.text", path.trim_end_matches('/'));
    match session.query(&format!(
        "SELECT content FROM read_text({})",
        quote_literal(&hint)
    )) {
        Ok(result) => result.first_value().map(|value| match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        }),
        Err(e) => {
            debug!(path = %hint, error = %e, "Version hint unavailable");
            None
        }
    }
}

/// The demo bucket holds plain Parquet files without table metadata.
fn demo_scan(root: &str) -> String {
    let glob = format!("{}/**/*.parquet", root.trim_end_matches('/'));
    format!("read_parquet({})", quote_literal(&glob))
}

fn sample_rows(session: &Session, scan: &str) -> Result<u64> {
    let result = session.query(&format!(
        "SELECT COUNT(*) AS sampled_rows FROM (SELECT 1 FROM {} LIMIT {})",
        scan, PROBE_SAMPLE_ROWS
    ))?;
    Ok(result.first_value().and_then(Value::as_u64).unwrap_or(0))
}
