//! Front-end configuration read from a RON file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use registry_core::{EntityKind, DEFAULT_PAGE_SIZE};
use registry_engine::{EngineConfig, FetchSettings, RetryPolicy};
use registry_logging::registry_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "registry.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("unknown resource `{0}` in base_overrides")]
    UnknownResource(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub api_base_url: String,
    pub upload_base_url: String,
    /// Per-resource base URLs, keyed by resource name (e.g. `"User"`).
    pub base_overrides: BTreeMap<String, String>,
    pub page_size: u32,
    pub request_timeout_ms: u64,
    pub attempts_per_url: u32,
    pub backoff_ms: u64,
    pub storage_path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5092/api".to_string(),
            upload_base_url: "http://localhost:5119/api".to_string(),
            base_overrides: BTreeMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_ms: 10_000,
            attempts_per_url: 3,
            backoff_ms: 200,
            storage_path: PathBuf::from(".registry_store.ron"),
        }
    }
}

impl RegistryConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                registry_info!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut base_overrides = BTreeMap::new();
        for (resource, url) in &self.base_overrides {
            let kind: EntityKind = resource
                .parse()
                .map_err(|_| ConfigError::UnknownResource(resource.clone()))?;
            base_overrides.insert(kind, url.clone());
        }
        Ok(EngineConfig {
            base_url: self.api_base_url.clone(),
            base_overrides,
            fetch: FetchSettings {
                request_timeout: self.request_timeout(),
                ..FetchSettings::default()
            },
            retry: RetryPolicy {
                max_attempts_per_url: self.attempts_per_url.max(1),
                base_delay: Duration::from_millis(self.backoff_ms),
                request_timeout: self.request_timeout(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::load(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.ron");
        fs::write(
            &path,
            r#"(
                api_base_url: "http://backend:8080/api",
                base_overrides: { "User": "http://localhost:5119/api" },
                attempts_per_url: 2,
            )"#,
        )
        .unwrap();

        let config = RegistryConfig::load(&path).unwrap();
        assert_eq!(config.api_base_url, "http://backend:8080/api");
        assert_eq!(config.backoff_ms, 200);

        let engine = config.engine_config().unwrap();
        assert_eq!(engine.retry.max_attempts_per_url, 2);
        assert_eq!(engine.base_url_for(EntityKind::User), "http://localhost:5119/api");
        assert_eq!(engine.base_url_for(EntityKind::Asset), "http://backend:8080/api");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.ron");
        fs::write(&path, "(page_size: \"ten\"").unwrap();
        assert!(matches!(
            RegistryConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn unknown_override_resource_is_rejected() {
        let config = RegistryConfig {
            base_overrides: BTreeMap::from([("Spaceship".to_string(), "http://x".to_string())]),
            ..RegistryConfig::default()
        };
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::UnknownResource(name)) if name == "Spaceship"
        ));
    }
}
