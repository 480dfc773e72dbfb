use duckdb::types::Value as DuckValue;
use duckdb::{params_from_iter, Connection};
use tracing::debug;

use super::converters::duck_value_into_json;
use super::{Capability, Engine, EngineSession, QueryResult};
use crate::error::{Error, Result};

/// In-process DuckDB. Every session is a separate in-memory database.
#[derive(Debug, Clone)]
pub struct DuckDbEngine {
    install_extensions: bool,
}

impl DuckDbEngine {
    pub fn new(install_extensions: bool) -> Self {
        Self { install_extensions }
    }
}

impl Default for DuckDbEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Engine for DuckDbEngine {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn version(&self) -> Result<String> {
        let conn = Connection::open_in_memory().map_err(engine_error)?;
        conn.query_row("SELECT version()", [], |row| row.get::<_, String>(0))
            .map_err(engine_error)
    }

    fn open_session(&self) -> Result<Box<dyn EngineSession>> {
        Ok(Box::new(DuckDbSession::open(self.install_extensions)?))
    }
}

pub struct DuckDbSession {
    conn: Connection,
    install_extensions: bool,
}

impl DuckDbSession {
    pub fn open(install_extensions: bool) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(engine_error)?;
        Ok(Self {
            conn,
            install_extensions,
        })
    }
}

impl EngineSession for DuckDbSession {
    fn load_capability(&self, capability: Capability) -> Result<()> {
        let extension = capability.extension();
        if self.install_extensions {
            self.conn
                .execute_batch(&format!("INSTALL {}", extension))
                .map_err(|e| Error::CapabilityUnavailable(format!("{}: {}", extension, e)))?;
        }
        self.conn
            .execute_batch(&format!("LOAD {}", extension))
            .map_err(|e| Error::CapabilityUnavailable(format!("{}: {}", extension, e)))?;
        debug!(extension, "Extension loaded");
        Ok(())
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(engine_error)
    }

    fn execute_with_params(&self, sql: &str, params: &[&str]) -> Result<()> {
        self.conn
            .execute(sql, params_from_iter(params.iter()))
            .map(|_| ())
            .map_err(engine_error)
    }

    fn query(&self, sql: &str) -> Result<QueryResult> {
        let mut stmt = self.conn.prepare(sql).map_err(engine_error)?;
        let mut rows = stmt.query([]).map_err(engine_error)?;
        let columns: Vec<String> = rows
            .as_ref()
            .map(|stmt| stmt.column_names())
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(engine_error)? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let value: DuckValue = row.get(idx).map_err(engine_error)?;
                values.push(duck_value_into_json(value));
            }
            out.push(values);
        }

        Ok(QueryResult { columns, rows: out })
    }
}

fn engine_error(e: duckdb::Error) -> Error {
    Error::Engine(e.to_string())
}
