//! Configuration module
//!
//! Handles loading and managing run configuration.

mod env;

pub use env::EnvConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::ExecutionMode;

/// Scheduler configuration for one run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Maximum node bodies in flight at once
    pub parallelism: usize,

    /// Mode applied to nodes that declare no preference
    pub default_mode: ExecutionMode,

    /// Grace period for draining the worker pool at run end, in
    /// milliseconds
    pub shutdown_grace_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallelism: num_cpus::get(),
            default_mode: ExecutionMode::Concurrent,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl ExecutionConfig {
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_default_mode(mut self, mode: ExecutionMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Apply `CANOPY_*` environment overrides on top of this configuration
    pub fn with_env_overrides(mut self, env: &EnvConfig) -> Self {
        if let Some(parallelism) = env.parallelism {
            self.parallelism = parallelism.max(1);
        }
        if let Some(mode) = env
            .default_mode
            .as_deref()
            .and_then(ExecutionMode::from_str)
        {
            self.default_mode = mode;
        }
        if let Some(grace) = env.shutdown_grace_ms {
            self.shutdown_grace_ms = grace;
        }
        self
    }
}

/// Application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scheduler defaults
    pub execution: ExecutionConfig,

    /// Default output format name
    #[serde(default)]
    pub format: Option<String>,

    /// Directory for stored run results
    #[serde(default)]
    pub results_dir: Option<String>,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutionConfig::default();
        assert!(config.parallelism >= 1);
        assert_eq!(config.default_mode, ExecutionMode::Concurrent);
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
    }

    #[test]
    fn test_parallelism_never_zero() {
        let config = ExecutionConfig::default().with_parallelism(0);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn test_env_overrides() {
        let env = EnvConfig {
            parallelism: Some(8),
            default_mode: Some("same_thread".to_string()),
            ..EnvConfig::default()
        };
        let config = ExecutionConfig::default().with_env_overrides(&env);
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.default_mode, ExecutionMode::SameThread);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");

        let config = AppConfig {
            execution: ExecutionConfig::default().with_parallelism(2),
            format: Some("json".to_string()),
            results_dir: None,
        };
        config.save(&path).expect("save config");

        let loaded = AppConfig::load(&path).expect("load config");
        assert_eq!(loaded.execution.parallelism, 2);
        assert_eq!(loaded.format.as_deref(), Some("json"));
    }
}
