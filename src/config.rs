//! Application configuration.
//!
//! Loaded from YAML files and environment variables, with defaults that run
//! against a local PostgreSQL out of the box.

use serde::Deserialize;

use crate::dsn::{Dsn, DsnError};
use crate::translate::DEFAULT_CONNECT_PREFIXES;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "errata.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "ERRATA_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "ERRATA";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database connection configuration.
    pub database: DatabaseConfig,
    /// Registry source configuration.
    pub registry: RegistryConfig,
    /// Change watcher configuration.
    pub watcher: WatcherConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `errata.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self::default()
    }

    /// Parse the configured database DSN.
    pub fn dsn(&self) -> Result<Dsn, DsnError> {
        Dsn::parse(&self.database.dsn)
    }

    /// Schema whose changes the watcher reacts to. Falls back to the DSN's
    /// database name when unset, matching servers that keep one schema per
    /// database.
    pub fn watch_schema(&self) -> Result<String, DsnError> {
        if !self.registry.schema.is_empty() {
            return Ok(self.registry.schema.clone());
        }
        Ok(self.dsn()?.dbname)
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// DSN in `user[:password]@[net[(addr)]]/dbname[?params]` form.
    pub dsn: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: "postgres@tcp(localhost:5432)/errata".to_string(),
        }
    }
}

/// Registry source configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Schema holding the definitions table. Empty means "derive from DSN".
    pub schema: String,
    /// Definitions table name.
    pub table: String,
    /// Notification channel the change trigger publishes on.
    pub channel: String,
    /// Message prefixes treated as connectivity failures when parsing
    /// transport errors. Empty means the built-in defaults.
    pub connect_error_prefixes: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            table: "error_definitions".to_string(),
            channel: "errata_definitions".to_string(),
            connect_error_prefixes: DEFAULT_CONNECT_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
        }
    }
}

/// Change watcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Minimum feed reconnect delay in milliseconds.
    pub min_retry_delay_ms: u64,
    /// Maximum feed reconnect delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            min_retry_delay_ms: 100,
            max_retry_delay_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.database.dsn, "postgres@tcp(localhost:5432)/errata");
        assert_eq!(config.registry.table, "error_definitions");
        assert_eq!(config.registry.channel, "errata_definitions");
        assert_eq!(config.watcher.min_retry_delay_ms, 100);
        assert_eq!(config.watcher.max_retry_delay_ms, 30_000);
    }

    #[test]
    fn test_config_for_test() {
        let config = Config::for_test();
        assert_eq!(config.registry.schema, "public");
        assert!(!config.registry.connect_error_prefixes.is_empty());
    }

    #[test]
    fn test_config_dsn_parses_default() {
        let config = Config::default();
        let dsn = config.dsn().expect("default DSN parses");
        assert_eq!(dsn.user, "postgres");
        assert_eq!(dsn.dbname, "errata");
    }

    #[test]
    fn test_watch_schema_prefers_configured_schema() {
        let config = Config::default();
        assert_eq!(config.watch_schema().expect("schema"), "public");
    }

    #[test]
    fn test_watch_schema_falls_back_to_dbname() {
        let mut config = Config::default();
        config.registry.schema = String::new();
        assert_eq!(config.watch_schema().expect("schema"), "errata");
    }
}
