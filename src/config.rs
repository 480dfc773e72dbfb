use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

use crate::error::{Error, Result};

static MEMORY_LIMIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9]+(\.[0-9]+)?\s*(B|KB|MB|GB|TB|KIB|MIB|GIB|TIB)$")
        .expect("MEMORY_LIMIT_REGEX pattern is valid")
});

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Upper bound on how long an HTTP request waits for the engine. The
    /// engine call itself is never cancelled.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            request_timeout_secs: None,
        }
    }
}

/// Process-wide resource caps applied identically to every session.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default = "default_install_extensions")]
    pub install_extensions: bool,
}

fn default_memory_limit() -> String {
    "2GB".to_string()
}

fn default_threads() -> u32 {
    4
}

fn default_install_extensions() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit: default_memory_limit(),
            threads: default_threads(),
            install_extensions: default_install_extensions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Hostname that replaces loopback hosts in object-storage-gateway
    /// endpoints, so one demo config works from the host and from inside
    /// the container network.
    #[serde(default = "default_internal_host")]
    pub internal_host: String,
    #[serde(default = "default_gateway_region")]
    pub gateway_region: String,
    #[serde(default = "default_demo_table_path")]
    pub demo_table_path: String,
}

fn default_internal_host() -> String {
    "minio".to_string()
}

fn default_gateway_region() -> String {
    "us-east-1".to_string()
}

fn default_demo_table_path() -> String {
    "s3://movies/data".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            internal_host: default_internal_host(),
            gateway_region: default_gateway_region(),
            demo_table_path: default_demo_table_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads the optional TOML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let contents = std::fs::read_to_string(p)
                    .map_err(|e| Error::InvalidRequest(format!("Cannot read config file: {}", e)))?;
                toml::from_str(&contents)
                    .map_err(|e| Error::InvalidRequest(format!("Invalid config file: {}", e)))
            }
            None => Ok(Config::default()),
        }
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CLOUDFLOE_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value: {}", val),
            }
        }
        if let Some(val) = lookup("CLOUDFLOE_LOG_FORMAT") {
            self.logging.format = match val.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            };
        }
        if let Some(val) = lookup("CLOUDFLOE_MEMORY_LIMIT") {
            self.engine.memory_limit = val;
        }
        if let Some(val) = lookup("CLOUDFLOE_THREADS") {
            match val.parse() {
                Ok(threads) => self.engine.threads = threads,
                Err(_) => warn!("Ignoring invalid CLOUDFLOE_THREADS value: {}", val),
            }
        }
        if let Some(val) = lookup("CLOUDFLOE_INSTALL_EXTENSIONS") {
            self.engine.install_extensions = val == "true" || val == "1";
        }
        if let Some(val) = lookup("CLOUDFLOE_INTERNAL_HOST") {
            self.storage.internal_host = val;
        }
        if let Some(val) = lookup("CLOUDFLOE_DEMO_TABLE_PATH") {
            self.storage.demo_table_path = val;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.threads == 0 {
            return Err(Error::InvalidRequest(
                "engine.threads must be greater than zero".into(),
            ));
        }
        if !MEMORY_LIMIT_REGEX.is_match(self.engine.memory_limit.trim()) {
            return Err(Error::InvalidRequest(format!(
                "engine.memory_limit is not a size: {}",
                self.engine.memory_limit
            )));
        }
        if self.storage.internal_host.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "storage.internal_host cannot be empty".into(),
            ));
        }
        if !self.storage.demo_table_path.starts_with("s3://") {
            warn!(
                "Demo table path does not use the s3:// scheme: {}",
                self.storage.demo_table_path
            );
        }
        if self.server.cors_origins.is_empty() {
            warn!("No CORS origins configured - browsers on other origins will be refused");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.cors_origins, vec!["*".to_string()]);
        assert!(config.server.request_timeout_secs.is_none());
        assert_eq!(config.engine.memory_limit, "2GB");
        assert_eq!(config.engine.threads, 4);
        assert!(config.engine.install_extensions);
        assert_eq!(config.storage.internal_host, "minio");
        assert_eq!(config.storage.gateway_region, "us-east-1");
        assert_eq!(config.storage.demo_table_path, "s3://movies/data");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_from_file_none_uses_defaults() {
        let config = Config::from_file(None).unwrap();
        assert_eq!(config.server.port, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_valid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9100
request_timeout_secs = 30

[engine]
memory_limit = "512MB"
threads = 2
install_extensions = false

[storage]
internal_host = "object-store"

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = Config::from_file(Some(file.path())).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.request_timeout_secs, Some(30));
        assert_eq!(config.engine.memory_limit, "512MB");
        assert_eq!(config.engine.threads, 2);
        assert!(!config.engine.install_extensions);
        assert_eq!(config.storage.internal_host, "object-store");
        assert_eq!(config.storage.gateway_region, "us-east-1");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();
        assert!(Config::from_file(Some(file.path())).is_err());
    }

    #[test]
    fn test_from_file_missing_file() {
        let result = Config::from_file(Some(Path::new("/nonexistent/cloudfloe.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_override_port_and_host() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup_from(&[("PORT", "9000"), ("CLOUDFLOE_HOST", "::")]));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "::");
    }

    #[test]
    fn test_env_override_invalid_port_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup_from(&[("PORT", "not-a-port")]));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_env_override_engine() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup_from(&[
            ("CLOUDFLOE_MEMORY_LIMIT", "1GB"),
            ("CLOUDFLOE_THREADS", "8"),
            ("CLOUDFLOE_INSTALL_EXTENSIONS", "0"),
        ]));
        assert_eq!(config.engine.memory_limit, "1GB");
        assert_eq!(config.engine.threads, 8);
        assert!(!config.engine.install_extensions);
    }

    #[test]
    fn test_env_override_storage_and_logging() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup_from(&[
            ("CLOUDFLOE_INTERNAL_HOST", "storage"),
            ("CLOUDFLOE_DEMO_TABLE_PATH", "s3://demo/table"),
            ("CLOUDFLOE_LOG_FORMAT", "JSON"),
        ]));
        assert_eq!(config.storage.internal_host, "storage");
        assert_eq!(config.storage.demo_table_path, "s3://demo/table");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let mut config = Config::default();
        config.engine.threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_memory_limit() {
        let mut config = Config::default();
        config.engine.memory_limit = "2GB'; DROP".to_string();
        assert!(config.validate().is_err());

        config.engine.memory_limit = "1.5 GiB".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_internal_host() {
        let mut config = Config::default();
        config.storage.internal_host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_default() {
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }
}
