use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::validation::validate_identifier;

pub const DEFAULT_ROW_LIMIT: u32 = 1_000;
pub const MAX_ROW_LIMIT: u32 = 10_000;

/// Estimated engine cost, USD per terabyte scanned.
const COST_PER_TB_USD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum StorageKind {
    /// Generic AWS S3: caller region, TLS.
    #[serde(rename = "s3")]
    GenericS3,
    /// TLS-terminated S3-compatible storage addressed path-style (R2 and friends).
    #[serde(rename = "r2")]
    PathStyleCompatible,
    /// Self-hosted object storage gateway (MinIO): plain HTTP, path-style.
    #[serde(rename = "minio")]
    ObjectGateway,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::GenericS3 => "s3",
            StorageKind::PathStyleCompatible => "r2",
            StorageKind::ObjectGateway => "minio",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    #[default]
    None,
    Rest,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Per-request storage and catalog settings supplied by the caller.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    pub storage_type: StorageKind,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub catalog_type: CatalogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_path: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("storage_type", &self.storage_type)
            .field("endpoint", &self.endpoint)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("region", &self.region)
            .field("catalog_type", &self.catalog_type)
            .field("catalog_endpoint", &self.catalog_endpoint)
            .field("namespace", &self.namespace)
            .field("table_path", &self.table_path)
            .finish()
    }
}

/// A REST catalog the session attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTarget {
    pub endpoint: String,
    pub namespace: String,
}

/// What a session reads from: a catalog, a table root, or the demo dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableTarget {
    Catalog(CatalogTarget),
    Path(String),
    Demo,
}

impl StorageConfig {
    pub fn new(
        storage_type: StorageKind,
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            storage_type,
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
            region: default_region(),
            catalog_type: CatalogKind::None,
            catalog_endpoint: None,
            namespace: None,
            table_path: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_rest_catalog(
        mut self,
        endpoint: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        self.catalog_type = CatalogKind::Rest;
        self.catalog_endpoint = Some(endpoint.into());
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_table_path(mut self, path: impl Into<String>) -> Self {
        self.table_path = Some(path.into());
        self
    }

    /// The configured table root, ignoring blank values.
    pub fn table_path(&self) -> Option<&str> {
        self.table_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Resolves the catalog settings. A REST catalog needs both an endpoint
    /// and a namespace.
    pub fn catalog(&self) -> Result<Option<CatalogTarget>> {
        match self.catalog_type {
            CatalogKind::None => Ok(None),
            CatalogKind::Rest => {
                let endpoint = self
                    .catalog_endpoint
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidConfiguration(
                            "catalogEndpoint is required when catalogType is 'rest'".into(),
                        )
                    })?;
                let namespace = self
                    .namespace
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidConfiguration(
                            "namespace is required when catalogType is 'rest'".into(),
                        )
                    })?;
                validate_identifier(namespace).map_err(|_| {
                    Error::InvalidConfiguration(format!("Invalid namespace: {}", namespace))
                })?;
                Ok(Some(CatalogTarget {
                    endpoint: endpoint.to_string(),
                    namespace: namespace.to_string(),
                }))
            }
        }
    }

    pub fn target(&self) -> Result<TableTarget> {
        if let Some(catalog) = self.catalog()? {
            return Ok(TableTarget::Catalog(catalog));
        }
        Ok(match self.table_path() {
            Some(path) => TableTarget::Path(path.to_string()),
            None => TableTarget::Demo,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_type != StorageKind::GenericS3 && self.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "endpoint is required for storage type '{}'",
                self.storage_type
            )));
        }
        if self.storage_type == StorageKind::GenericS3 && self.region.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "region is required for storage type 's3'".into(),
            ));
        }
        if let Some(path) = self.table_path() {
            if !path.contains("://") {
                return Err(Error::InvalidConfiguration(format!(
                    "tablePath must be a storage URI (e.g. s3://bucket/table): {}",
                    path
                )));
            }
        }
        self.catalog().map(|_| ())
    }
}

/// Caller row cap, always within `1..=MAX_ROW_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RowLimit(u32);

impl RowLimit {
    pub fn new(limit: u32) -> Result<Self> {
        if limit == 0 || limit > MAX_ROW_LIMIT {
            return Err(Error::InvalidRequest(format!(
                "rowLimit must be between 1 and {}, got {}",
                MAX_ROW_LIMIT, limit
            )));
        }
        Ok(Self(limit))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for RowLimit {
    fn default() -> Self {
        Self(DEFAULT_ROW_LIMIT)
    }
}

impl fmt::Display for RowLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The caller's SQL plus its row cap. Rewrites produce new fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlanFragment {
    sql: String,
    row_limit: RowLimit,
}

impl QueryPlanFragment {
    pub fn new(sql: impl Into<String>, row_limit: RowLimit) -> Self {
        Self {
            sql: sql.into(),
            row_limit,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn row_limit(&self) -> RowLimit {
        self.row_limit
    }

    pub fn with_sql(&self, sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            row_limit: self.row_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub execution_time_ms: u64,
    pub bytes_scanned: u64,
    pub rows_returned: u64,
    pub estimated_cost: f64,
}

impl ExecutionStats {
    /// Informational only. Scanned bytes are approximated from the size of
    /// the serialized result, as the engine does not report them.
    pub fn estimate(rows: &[Vec<Value>], execution_time_ms: u64) -> Self {
        let serialized_len = serde_json::to_string(rows).map(|s| s.len()).unwrap_or(0);
        let bytes_scanned = serialized_len as u64 * 2;
        Self {
            execution_time_ms,
            bytes_scanned,
            rows_returned: rows.len() as u64,
            estimated_cost: bytes_scanned as f64 / 1e12 * COST_PER_TB_USD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub stats: ExecutionStats,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ExecutionResult {
    /// `truncated` is a lower-bound signal: hitting the cap exactly cannot be
    /// told apart from more rows existing.
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
        execution_time_ms: u64,
        row_limit: RowLimit,
        warnings: Vec<String>,
    ) -> Self {
        let stats = ExecutionStats::estimate(&rows, execution_time_ms);
        let truncated = rows.len() as u64 >= u64::from(row_limit.get());
        Self {
            columns,
            rows,
            stats,
            truncated,
            warnings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            warnings: Vec::new(),
        }
    }

    pub fn inconclusive(warning: impl Into<String>) -> Self {
        Self {
            valid: true,
            warnings: vec![warning.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TableInfo {
    #[serde(rename_all = "camelCase")]
    Catalog { namespace: String, tables: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Path {
        path: String,
        version_hint: Option<String>,
        sampled_rows: u64,
    },
}
