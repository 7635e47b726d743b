//! `config.toml` loading
//!
//! ```toml
//! [reconcile]
//! max_attempts = 5
//! base_delay_ms = 250
//! jobs = 8
//! timeout_secs = 120
//!
//! [registry]
//! disabled = ["poller"]
//!
//! [store]
//! path = "~/oidsync/relationships.json"
//! ```
//!
//! Every key is optional; a missing file means all defaults.

use anyhow::{Context, Result, bail};
use oid::TypeRegistry;
use reconcile::{ConvergeOptions, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub reconcile: ReconcileConfig,
    pub registry: RegistryConfig,
    pub store: StoreConfig,
}

/// Retry, parallelism and deadline settings for `grants apply`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    pub jobs: usize,
    /// Deadline for a whole apply run; none when unset
    pub timeout_secs: Option<u64>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            backoff_factor: retry.backoff_factor,
            jobs: ConvergeOptions::default().jobs,
            timeout_secs: None,
        }
    }
}

impl ReconcileConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }

    pub fn converge_options(&self, dry_run: bool) -> ConvergeOptions {
        ConvergeOptions {
            dry_run,
            jobs: self.jobs,
            retry: self.retry(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Which resource types references may name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Type tags to remove from the standard registry
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Relationship store location; `~` and `$VARS` are expanded
    pub path: Option<String>,
}

impl Config {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file()?)
    }

    /// Load from `path`, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.reconcile.max_attempts == 0 {
            bail!("reconcile.max_attempts must be at least 1");
        }
        if self.reconcile.jobs == 0 {
            bail!("reconcile.jobs must be at least 1");
        }
        let factor = self.reconcile.backoff_factor;
        if factor.is_nan() || factor < 1.0 {
            bail!("reconcile.backoff_factor must be at least 1.0");
        }
        Ok(())
    }

    /// Standard registry minus `registry.disabled`
    pub fn registry(&self) -> Result<TypeRegistry> {
        let standard = TypeRegistry::standard();
        let mut disabled = Vec::with_capacity(self.registry.disabled.len());
        for tag in &self.registry.disabled {
            let kind = standard
                .type_of(tag)
                .with_context(|| format!("registry.disabled: unknown resource type {tag:?}"))?;
            disabled.push(kind);
        }
        Ok(standard.without(&disabled))
    }

    /// Relationship store location
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(paths::expand(path)),
            None => paths::store_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oid::ResourceType;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reconcile.max_attempts, 3);
        assert_eq!(config.reconcile.timeout(), None);
    }

    #[test]
    fn test_partial_config() {
        let (_dir, path) = write_config(
            r#"
[reconcile]
max_attempts = 5
jobs = 8
timeout_secs = 90

[registry]
disabled = ["poller", "filedrop"]

[store]
path = "/srv/oidsync/relationships.json"
"#,
        );
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.reconcile.max_attempts, 5);
        assert_eq!(config.reconcile.base_delay_ms, 500);

        let opts = config.reconcile.converge_options(true);
        assert!(opts.dry_run);
        assert_eq!(opts.jobs, 8);
        assert_eq!(opts.retry.max_attempts, 5);
        assert_eq!(config.reconcile.timeout(), Some(Duration::from_secs(90)));

        let registry = config.registry().unwrap();
        assert!(!registry.contains(ResourceType::Poller));
        assert!(registry.contains(ResourceType::Dataset));
        assert_eq!(
            config.store_path().unwrap(),
            PathBuf::from("/srv/oidsync/relationships.json")
        );
    }

    #[test]
    fn test_unknown_disabled_type() {
        let (_dir, path) = write_config("[registry]\ndisabled = [\"gadget\"]\n");
        let config = Config::load_from(&path).unwrap();
        let err = config.registry().unwrap_err();
        assert!(err.to_string().contains("gadget"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let (_dir, path) = write_config("[reconcile]\nmax_attempts = 0\n");
        assert!(Config::load_from(&path).is_err());

        let (_dir, path) = write_config("[reconcile]\nbackoff_factor = 0.5\n");
        assert!(Config::load_from(&path).is_err());

        let (_dir, path) = write_config("[reconcile]\nretries = 3\n");
        assert!(Config::load_from(&path).is_err());
    }
}
