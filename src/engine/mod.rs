//! Boundary to the embedded SQL engine.
//!
//! The gateway only needs a small surface: open an isolated session, load a
//! capability, run statements (optionally with bound parameters) and run
//! queries that return rows. All calls block.

mod converters;
mod duckdb;
mod scripted;

pub use self::duckdb::{DuckDbEngine, DuckDbSession};
pub use self::scripted::{Recorded, ScriptedEngine};

use serde_json::Value;

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Remote object storage access (S3 protocol).
    ObjectStorage,
    /// Table-format aware scans and metadata (Iceberg).
    TableFormat,
}

impl Capability {
    pub fn extension(&self) -> &'static str {
        match self {
            Capability::ObjectStorage => "httpfs",
            Capability::TableFormat => "iceberg",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Factory for isolated sessions. Implementations must not share mutable
/// state between the sessions they hand out.
pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;

    fn version(&self) -> Result<String>;

    fn open_session(&self) -> Result<Box<dyn EngineSession>>;
}

pub trait EngineSession: Send {
    fn load_capability(&self, capability: Capability) -> Result<()>;

    fn execute(&self, sql: &str) -> Result<()>;

    fn execute_with_params(&self, sql: &str, params: &[&str]) -> Result<()>;

    fn query(&self, sql: &str) -> Result<QueryResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capability_extensions() {
        assert_eq!(Capability::ObjectStorage.extension(), "httpfs");
        assert_eq!(Capability::TableFormat.extension(), "iceberg");
    }

    #[test]
    fn test_query_result_first_value() {
        let result = QueryResult {
            columns: vec!["n".into()],
            rows: vec![vec![json!(7)], vec![json!(8)]],
        };
        assert_eq!(result.first_value(), Some(&json!(7)));
        assert_eq!(QueryResult::default().first_value(), None);
    }
}
