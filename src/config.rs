//! Service configuration, loaded from YAML

use crate::engine::constants::*;
use crate::index::ExtractorConfig;
use crate::query::LocatorStrategy;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub index: IndexConfig,
    /// Registry YAML; the built-in registry is used when absent
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
    #[serde(default)]
    pub write_mode: WriteMode,
    #[serde(default)]
    pub locator: LocatorStrategy,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default = "default_api_version")]
    pub index_api_version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            index: IndexConfig::default(),
            schema_path: None,
            write_mode: WriteMode::default(),
            locator: LocatorStrategy::default(),
            extractor: ExtractorConfig::default(),
            loader: LoaderConfig::default(),
            limits: LimitsConfig::default(),
            index_api_version: default_api_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index directory; the index lives in RAM when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_writer_heap")]
    pub writer_heap_bytes: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { path: None, writer_heap_bytes: DEFAULT_WRITER_HEAP_BYTES }
    }
}

/// How `PUT /index/{id}` bodies are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// JSON body naming source and metadata locations
    #[default]
    Extraction,
    /// Raw JSON envelope carrying pre-extracted text
    Envelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Timeout for fetching `http(s):` source and metadata locations
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { http_timeout_secs: default_http_timeout_secs() }
    }
}

impl LoaderConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl ServiceConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| anyhow!("Invalid service configuration: {}", e))
    }

    /// Load from a file; relative `schema_path` and index `path` resolve against its directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read configuration {}: {}", path.display(), e))?;
        let mut config = Self::from_yaml(&yaml).map_err(|e| anyhow!("{}: {}", path.display(), e))?;

        if let Some(base) = path.parent() {
            config.schema_path = config.schema_path.map(|p| resolve(base, p));
            config.index.path = config.index.path.map(|p| resolve(base, p));
        }
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_writer_heap() -> usize {
    DEFAULT_WRITER_HEAP_BYTES
}

fn default_max_query_length() -> usize {
    DEFAULT_MAX_QUERY_LENGTH
}

fn default_max_payload_bytes() -> u64 {
    DEFAULT_MAX_PAYLOAD_BYTES
}

fn default_api_version() -> String {
    "0.1.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::OverflowPolicy;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ServiceConfig::from_yaml("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.index.path, None);
        assert_eq!(config.write_mode, WriteMode::Extraction);
        assert_eq!(config.limits.max_query_length, 5000);
        assert_eq!(config.limits.max_payload_bytes, 10 * 1024 * 1024 * 1024);
        assert_eq!(config.index_api_version, "0.1.0");
        assert_eq!(config.extractor.max_length, None);
        assert_eq!(config.loader.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
server:
  host: 0.0.0.0
  port: 9041
index:
  path: /var/lib/search
write_mode: envelope
locator:
  strategy: stored_attribute
  attribute: sourceLocation
extractor:
  max_length: 100000
  overflow: reject
loader:
  http_timeout_secs: 5
limits:
  max_query_length: 100
index_api_version: "1.2.0"
"#;
        let config = ServiceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.index.path.as_deref(), Some(Path::new("/var/lib/search")));
        assert_eq!(config.index.writer_heap_bytes, DEFAULT_WRITER_HEAP_BYTES);
        assert_eq!(config.write_mode, WriteMode::Envelope);
        assert_eq!(config.locator, LocatorStrategy::StoredAttribute { attribute: "sourceLocation".to_string() });
        assert_eq!(config.extractor.overflow, OverflowPolicy::Reject);
        assert_eq!(config.loader.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.limits.max_query_length, 100);
        assert_eq!(config.limits.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
        assert_eq!(config.index_api_version, "1.2.0");
    }

    #[test]
    fn test_unknown_write_mode_is_rejected() {
        assert!(ServiceConfig::from_yaml("write_mode: bulk").is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.yaml");
        fs::write(&path, "schema_path: schema.yaml\nindex:\n  path: data/index\n").unwrap();

        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.schema_path, Some(dir.path().join("schema.yaml")));
        assert_eq!(config.index.path, Some(dir.path().join("data/index")));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ServiceConfig::load(dir.path().join("absent.yaml")).is_err());
    }
}
