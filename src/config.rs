//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.dexcache/config.toml` (user)
//! 3. `/etc/dexcache/config.toml` (system)
//!
//! Unlike an explicit path, the two standard locations are optional: when
//! neither exists the built-in defaults are used.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{DEFAULT_BASE_URL, DexOptions};
use crate::cache::{CacheOptions, DEFAULT_MAX_AGE, DEFAULT_PAGE_SIZE};
use crate::persist::FileBlobStore;
use crate::{CacheError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Upstream API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API (default: https://pokeapi.co/api/v2).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Cache tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Default staleness threshold in seconds (default: 300).
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
    /// Retries after the first attempt (default: 2).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Items per page (default: 20).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Per-kind overrides, e.g. `[cache.kinds.type]`.
    #[serde(default)]
    pub kinds: HashMap<String, KindConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age(),
            max_attempts: default_max_attempts(),
            page_size: default_page_size(),
            kinds: HashMap::new(),
        }
    }
}

fn default_max_age() -> u64 {
    DEFAULT_MAX_AGE.as_secs()
}

fn default_max_attempts() -> u32 {
    2
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Overrides for one resource kind.
#[derive(Debug, Clone, Deserialize)]
pub struct KindConfig {
    pub max_age_secs: u64,
}

/// Where persisted state lives.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Directory for persisted blobs (default: `<data dir>/dexcache`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(FileBlobStore::default_dir)
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided; must exist)
    /// 2. `~/.dexcache/config.toml`
    /// 3. `/etc/dexcache/config.toml`
    /// 4. Built-in defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CacheError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CacheError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path, or `None` to use defaults.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(CacheError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".dexcache").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/dexcache/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Cache options described by the `[cache]` section, layered over the
    /// facade's per-kind defaults.
    pub fn cache_options(&self) -> CacheOptions {
        let mut options = DexOptions::default_cache_options()
            .max_age(Duration::from_secs(self.cache.max_age_secs))
            .max_attempts(self.cache.max_attempts)
            .page_size(self.cache.page_size);
        for (kind, overrides) in &self.cache.kinds {
            options = options.kind_max_age(kind, Duration::from_secs(overrides.max_age_secs));
        }
        options
    }

    /// Everything needed to build an [`api::Dex`](crate::api::Dex).
    pub fn dex_options(&self) -> DexOptions {
        DexOptions {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
            cache: self.cache_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ResourceKind;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://pokeapi.co/api/v2");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cache.max_age_secs, 300);
        assert_eq!(config.cache.max_attempts, 2);
        assert_eq!(config.cache.page_size, 20);
        assert!(config.storage.dir.is_none());
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [cache]
            max_age_secs = 60
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.max_age_secs, 60);
        // Defaults preserved
        assert_eq!(config.cache.max_attempts, 2);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [api]
            base_url = "http://localhost:8080/api/v2"
            timeout_secs = 5

            [cache]
            max_age_secs = 120
            max_attempts = 4
            page_size = 50

            [cache.kinds.type]
            max_age_secs = 3600

            [storage]
            dir = "/var/lib/dexcache"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080/api/v2");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.cache.page_size, 50);
        assert_eq!(config.cache.kinds["type"].max_age_secs, 3600);
        assert_eq!(
            config.storage.resolved_dir(),
            PathBuf::from("/var/lib/dexcache")
        );
    }

    #[test]
    fn cache_options_apply_overrides() {
        let toml = r#"
            [cache]
            max_age_secs = 90
            max_attempts = 0
            page_size = 10

            [cache.kinds.pokemon]
            max_age_secs = 5
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let options = config.cache_options();
        assert_eq!(options.retry.max_attempts, 0);
        assert_eq!(options.page_size, 10);
        assert_eq!(
            options.freshness.max_age_for(&ResourceKind::new("pokemon").unwrap()),
            Duration::from_secs(5)
        );
        assert_eq!(
            options.freshness.max_age_for(&ResourceKind::new("berry").unwrap()),
            Duration::from_secs(90)
        );
        // Facade default for type membership survives
        assert_eq!(
            options.freshness.max_age_for(&ResourceKind::new("type").unwrap()),
            Duration::from_secs(30 * 60)
        );
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn malformed_config_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache\nmax_age_secs = ").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, CacheError::Configuration(_)));
    }
}
