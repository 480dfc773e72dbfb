pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod validation;

pub use api::{router, AppState};
pub use config::{Config, LogFormat};
pub use domain::{
    CatalogKind, ExecutionResult, ExecutionStats, QueryPlanFragment, RowLimit, StorageConfig,
    StorageKind, TableInfo, ValidationOutcome,
};
pub use engine::{DuckDbEngine, Engine, EngineSession, ScriptedEngine};
pub use error::{Error, Result};
pub use gateway::Gateway;
