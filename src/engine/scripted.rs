use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::{Capability, Engine, EngineSession, QueryResult};
use crate::error::{Error, Result};

/// One call observed by a [`ScriptedEngine`] session, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Capability(Capability),
    Statement(String),
    Parameterized { sql: String, params: Vec<String> },
    Query(String),
}

#[derive(Default)]
struct Script {
    responses: Vec<(String, QueryResult)>,
    failures: Vec<(String, String)>,
    missing_capabilities: Vec<Capability>,
    fail_open: bool,
}

#[derive(Default)]
struct Journal {
    sessions_opened: usize,
    calls: Vec<Recorded>,
}

/// Engine without a database. Answers queries from registered results,
/// fails statements matching registered fragments and records every call.
/// Clones share the same script and journal.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
    journal: Arc<Mutex<Journal>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries containing `fragment` return these columns and rows. The
    /// first matching registration wins. Unmatched queries return no rows.
    pub fn respond(&self, fragment: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> &Self {
        self.script.lock().responses.push((
            fragment.to_string(),
            QueryResult {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        ));
        self
    }

    /// Any statement or query containing `fragment` fails with `message`.
    pub fn fail_on(&self, fragment: &str, message: &str) -> &Self {
        self.script
            .lock()
            .failures
            .push((fragment.to_string(), message.to_string()));
        self
    }

    pub fn without_capability(&self, capability: Capability) -> &Self {
        self.script.lock().missing_capabilities.push(capability);
        self
    }

    pub fn fail_open(&self) -> &Self {
        self.script.lock().fail_open = true;
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.journal.lock().sessions_opened
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.journal.lock().calls.clone()
    }

    /// SQL text of every statement and query, parameterized or not.
    pub fn executed_sql(&self) -> Vec<String> {
        self.journal
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Recorded::Capability(_) => None,
                Recorded::Statement(sql)
                | Recorded::Query(sql)
                | Recorded::Parameterized { sql, .. } => Some(sql.clone()),
            })
            .collect()
    }

    fn failure_for(&self, sql: &str) -> Option<Error> {
        self.script
            .lock()
            .failures
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, message)| Error::Engine(message.clone()))
    }

    fn record(&self, call: Recorded) {
        self.journal.lock().calls.push(call);
    }
}

impl Engine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn version(&self) -> Result<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    fn open_session(&self) -> Result<Box<dyn EngineSession>> {
        if self.script.lock().fail_open {
            return Err(Error::Engine("cannot open session".into()));
        }
        self.journal.lock().sessions_opened += 1;
        Ok(Box::new(ScriptedSession {
            engine: self.clone(),
        }))
    }
}

struct ScriptedSession {
    engine: ScriptedEngine,
}

impl EngineSession for ScriptedSession {
    fn load_capability(&self, capability: Capability) -> Result<()> {
        self.engine.record(Recorded::Capability(capability));
        if self
            .engine
            .script
            .lock()
            .missing_capabilities
            .contains(&capability)
        {
            return Err(Error::CapabilityUnavailable(
                capability.extension().to_string(),
            ));
        }
        Ok(())
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.engine.record(Recorded::Statement(sql.to_string()));
        match self.engine.failure_for(sql) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn execute_with_params(&self, sql: &str, params: &[&str]) -> Result<()> {
        self.engine.record(Recorded::Parameterized {
            sql: sql.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        });
        match self.engine.failure_for(sql) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn query(&self, sql: &str) -> Result<QueryResult> {
        self.engine.record(Recorded::Query(sql.to_string()));
        if let Some(err) = self.engine.failure_for(sql) {
            return Err(err);
        }
        let script = self.engine.script.lock();
        Ok(script
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }
}
