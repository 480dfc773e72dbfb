use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{EngineConfig, StorageSettings};
use crate::domain::{CatalogTarget, StorageConfig, StorageKind};
use crate::engine::{Capability, Engine, EngineSession, QueryResult};
use crate::error::{Error, Result};
use crate::metrics::record_session_built;
use crate::validation::quote_literal;

/// Logical name the REST catalog is attached under.
pub const CATALOG_ALIAS: &str = "lakehouse";
const CATALOG_SECRET: &str = "cloudfloe_catalog_secret";

const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// A configured engine session bound to one request's storage settings.
/// Dropping it discards the underlying database.
pub struct Session {
    inner: Box<dyn EngineSession>,
    catalog: Option<CatalogTarget>,
    storage_kind: StorageKind,
}

impl Session {
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.inner.execute(sql)
    }

    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        self.inner.query(sql)
    }

    pub fn enable_profiling(&self) -> Result<()> {
        self.inner.execute("SET enable_profiling = 'no_output'")
    }

    pub fn catalog(&self) -> Option<&CatalogTarget> {
        self.catalog.as_ref()
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage_kind
    }
}

pub struct SessionBuilder {
    engine: Arc<dyn Engine>,
    limits: EngineConfig,
    settings: StorageSettings,
}

impl SessionBuilder {
    pub fn new(engine: Arc<dyn Engine>, limits: EngineConfig, settings: StorageSettings) -> Self {
        Self {
            engine,
            limits,
            settings,
        }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Opens a fresh session and applies `config` to it. Nothing is shared
    /// with sessions built before or after. Failures while applying caller
    /// settings become `InvalidConfiguration`. A missing capability is
    /// reported as `CapabilityUnavailable`.
    pub fn build(&self, config: &StorageConfig) -> Result<Session> {
        config.validate()?;
        let catalog = config.catalog()?;

        let inner = self.engine.open_session()?;
        inner.load_capability(Capability::ObjectStorage)?;
        inner.load_capability(Capability::TableFormat)?;

        self.apply_limits(inner.as_ref())
            .map_err(|e| invalid("resource limits", e))?;
        self.apply_storage(inner.as_ref(), config)
            .map_err(|e| invalid("storage settings", e))?;
        apply_credentials(inner.as_ref(), config).map_err(|e| invalid("credentials", e))?;

        if let Some(target) = &catalog {
            attach_catalog(inner.as_ref(), config, target)
                .map_err(|e| invalid("catalog attach", e))?;
        }

        record_session_built(config.storage_type.as_str());
        info!(
            storage_type = %config.storage_type,
            catalog = catalog.is_some(),
            "Session configured"
        );

        Ok(Session {
            inner,
            catalog,
            storage_kind: config.storage_type,
        })
    }

    /// Opens a throwaway session and loads both capabilities.
    pub fn preflight(&self) -> Result<()> {
        let session = self.engine.open_session()?;
        session.load_capability(Capability::ObjectStorage)?;
        session.load_capability(Capability::TableFormat)?;
        Ok(())
    }

    fn apply_limits(&self, session: &dyn EngineSession) -> Result<()> {
        session.execute(&format!(
            "SET memory_limit = {}",
            quote_literal(&self.limits.memory_limit)
        ))?;
        session.execute(&format!("SET threads = {}", self.limits.threads))
    }

    fn apply_storage(&self, session: &dyn EngineSession, config: &StorageConfig) -> Result<()> {
        match config.storage_type {
            StorageKind::ObjectGateway => {
                let endpoint =
                    rewrite_loopback(strip_scheme(&config.endpoint), &self.settings.internal_host);
                debug!(endpoint = %endpoint, "Gateway endpoint resolved");
                session.execute_with_params("SET s3_endpoint = ?", &[endpoint.as_str()])?;
                session.execute("SET s3_url_style = 'path'")?;
                session.execute("SET s3_use_ssl = false")?;
                session.execute_with_params(
                    "SET s3_region = ?",
                    &[self.settings.gateway_region.as_str()],
                )
            }
            StorageKind::PathStyleCompatible => {
                session
                    .execute_with_params("SET s3_endpoint = ?", &[strip_scheme(&config.endpoint)])?;
                session.execute("SET s3_url_style = 'path'")?;
                session.execute("SET s3_use_ssl = true")
            }
            StorageKind::GenericS3 => {
                session.execute_with_params("SET s3_region = ?", &[config.region.as_str()])?;
                session.execute("SET s3_use_ssl = true")
            }
        }
    }
}

fn apply_credentials(session: &dyn EngineSession, config: &StorageConfig) -> Result<()> {
    session.execute_with_params("SET s3_access_key_id = ?", &[config.access_key.as_str()])?;
    session.execute_with_params("SET s3_secret_access_key = ?", &[config.secret_key.as_str()])?;
    if let Some(token) = config.session_token() {
        session.execute_with_params("SET s3_session_token = ?", &[token])?;
    }
    Ok(())
}

// DDL cannot take bound parameters, so the secret and attach statements
// carry quoted literals.
fn attach_catalog(
    session: &dyn EngineSession,
    config: &StorageConfig,
    target: &CatalogTarget,
) -> Result<()> {
    session.execute(&format!(
        "CREATE SECRET {} (TYPE ICEBERG, CLIENT_ID {}, CLIENT_SECRET {}, ENDPOINT {})",
        CATALOG_SECRET,
        quote_literal(&config.access_key),
        quote_literal(&config.secret_key),
        quote_literal(&target.endpoint),
    ))?;
    session.execute(&format!(
        "ATTACH {} AS {} (TYPE ICEBERG, SECRET {}, ENDPOINT {})",
        quote_literal(&target.namespace),
        CATALOG_ALIAS,
        CATALOG_SECRET,
        quote_literal(&target.endpoint),
    ))
}

fn invalid(step: &str, err: Error) -> Error {
    match err {
        Error::Engine(msg) => Error::InvalidConfiguration(format!("{}: {}", step, msg)),
        other => other,
    }
}

pub(crate) fn strip_scheme(endpoint: &str) -> &str {
    let endpoint = endpoint.trim();
    endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint)
}

/// Replaces a loopback host (keeping any port) with `internal_host`.
pub(crate) fn rewrite_loopback(endpoint: &str, internal_host: &str) -> String {
    let (host, rest) = match endpoint.find([':', '/']) {
        Some(idx) => endpoint.split_at(idx),
        None => (endpoint, ""),
    };
    if LOOPBACK_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)) {
        format!("{}{}", internal_host, rest)
    } else {
        endpoint.to_string()
    }
}
