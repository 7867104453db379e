//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "CANOPY";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Parallelism from CANOPY_PARALLELISM
    pub parallelism: Option<usize>,
    /// Default execution mode from CANOPY_DEFAULT_MODE
    pub default_mode: Option<String>,
    /// Pool shutdown grace from CANOPY_SHUTDOWN_GRACE_MS
    pub shutdown_grace_ms: Option<u64>,
    /// Output format from CANOPY_FORMAT
    pub format: Option<String>,
    /// Results directory from CANOPY_RESULTS_DIR
    pub results_dir: Option<String>,
    /// Config file from CANOPY_CONFIG
    pub config_file: Option<String>,
    /// Verbose from CANOPY_VERBOSE
    pub verbose: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            parallelism: get_env_parse("PARALLELISM"),
            default_mode: get_env("DEFAULT_MODE"),
            shutdown_grace_ms: get_env_parse("SHUTDOWN_GRACE_MS"),
            format: get_env("FORMAT"),
            results_dir: get_env("RESULTS_DIR"),
            config_file: get_env("CONFIG"),
            verbose: get_env_bool("VERBOSE"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.parallelism.is_some()
            || self.default_mode.is_some()
            || self.shutdown_grace_ms.is_some()
            || self.format.is_some()
            || self.results_dir.is_some()
            || self.config_file.is_some()
            || self.verbose.is_some()
    }

    /// Get output format with fallback
    pub fn format_or(&self, default: &str) -> String {
        self.format.clone().unwrap_or_else(|| default.to_string())
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_env_has_none() {
        let config = EnvConfig::default();
        assert!(!config.has_any());
        assert_eq!(config.format_or("table"), "table");
    }

    #[test]
    fn test_env_round_trip() {
        env::set_var("CANOPY_PARALLELISM", "6");
        env::set_var("CANOPY_VERBOSE", "yes");

        let config = EnvConfig::load();
        assert_eq!(config.parallelism, Some(6));
        assert_eq!(config.verbose, Some(true));
        assert!(config.has_any());

        env::remove_var("CANOPY_PARALLELISM");
        env::remove_var("CANOPY_VERBOSE");
    }
}
