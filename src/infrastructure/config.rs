//! Configuration infrastructure
//!
//! Settings live in a JSON file (platform config directory by default) and
//! can be overridden per-process through `PRICEWATCH_*` environment
//! variables. A default file is written on first run so every tunable is
//! visible to the operator.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

/// Compile-time defaults for every tunable.
pub mod defaults {
    /// Seconds between scan passes.
    pub const SCAN_INTERVAL_SECONDS: u64 = 3600;

    /// Ceiling on simultaneous in-flight product checks.
    pub const MAX_CONCURRENT_CHECKS: usize = 5;

    /// Fetch attempts before a product is given up for the pass.
    pub const MAX_FETCH_ATTEMPTS: u32 = 40;

    /// Flat random backoff range between attempts, in seconds.
    pub const BACKOFF_MIN_SECONDS: u64 = 1;
    pub const BACKOFF_MAX_SECONDS: u64 = 5;

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 7;
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.141 Safari/537.36";
    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

    pub const DATABASE_FILE: &str = "tracker.db";
    pub const LOG_LEVEL: &str = "info";
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub fetch: FetchConfig,
    pub retry: RetryConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Scan scheduling and fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between scan passes.
    pub scan_interval_seconds: u64,

    /// Maximum simultaneous in-flight product checks per pass.
    pub max_concurrent_checks: usize,
}

impl MonitorConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_seconds)
    }
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
}

/// Retry behavior for transient fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_min_seconds: u64,
    pub backoff_max_seconds: u64,
}

impl RetryConfig {
    pub fn backoff_min(&self) -> Duration {
        Duration::from_secs(self.backoff_min_seconds)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_seconds)
    }
}

/// Storage location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,

    /// Also write logs to a daily-rolling file.
    pub file_output: bool,

    /// Log file directory; defaults next to the executable.
    pub directory: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "sqlx": "warn").
    pub module_filters: HashMap<String, String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_seconds: defaults::SCAN_INTERVAL_SECONDS,
            max_concurrent_checks: defaults::MAX_CONCURRENT_CHECKS,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_FETCH_ATTEMPTS,
            backoff_min_seconds: defaults::BACKOFF_MIN_SECONDS,
            backoff_max_seconds: defaults::BACKOFF_MAX_SECONDS,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("pricewatch").join(defaults::DATABASE_FILE),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            file_output: false,
            directory: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Environment variables take precedence over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_parse::<u64>("PRICEWATCH_SCAN_INTERVAL_SECONDS") {
            self.monitor.scan_interval_seconds = value;
        }
        if let Some(value) = env_parse::<usize>("PRICEWATCH_MAX_CONCURRENT_CHECKS") {
            self.monitor.max_concurrent_checks = value;
        }
        if let Some(value) = env_parse::<u32>("PRICEWATCH_MAX_FETCH_ATTEMPTS") {
            self.retry.max_attempts = value;
        }
        if let Some(value) = env_parse::<u64>("PRICEWATCH_BACKOFF_MIN_SECONDS") {
            self.retry.backoff_min_seconds = value;
        }
        if let Some(value) = env_parse::<u64>("PRICEWATCH_BACKOFF_MAX_SECONDS") {
            self.retry.backoff_max_seconds = value;
        }
        if let Ok(value) = std::env::var("PRICEWATCH_DATABASE_PATH") {
            self.database.path = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("PRICEWATCH_LOG_LEVEL") {
            self.logging.level = value;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

/// Loads and saves the configuration file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default location in the platform config directory.
    pub fn new() -> Result<Self> {
        let dir = dirs::config_dir()
            .context("could not determine the user configuration directory")?
            .join("pricewatch");
        Ok(Self {
            config_path: dir.join("pricewatch.json"),
        })
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Reads the config file, writing defaults first if it does not exist,
    /// then applies environment overrides.
    pub async fn load(&self) -> Result<AppConfig> {
        let mut config = if fs::try_exists(&self.config_path).await? {
            let raw = fs::read_to_string(&self.config_path)
                .await
                .with_context(|| format!("failed to read {}", self.config_path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid configuration in {}", self.config_path.display()))?
        } else {
            let config = AppConfig::default();
            self.save(&config).await?;
            info!("wrote default configuration to {}", self.config_path.display());
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub async fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, raw)
            .await
            .with_context(|| format!("failed to write {}", self.config_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_documented_tunables() {
        let config = AppConfig::default();
        assert_eq!(config.monitor.scan_interval_seconds, 3600);
        assert_eq!(config.monitor.max_concurrent_checks, 5);
        assert_eq!(config.retry.max_attempts, 40);
        assert_eq!(config.retry.backoff_min(), Duration::from_secs(1));
        assert_eq!(config.retry.backoff_max(), Duration::from_secs(5));
    }

    #[test]
    fn partial_config_files_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"monitor": {"scan_interval_seconds": 60}}"#).unwrap();
        assert_eq!(config.monitor.scan_interval_seconds, 60);
        assert_eq!(config.monitor.max_concurrent_checks, 5);
        assert_eq!(config.retry.max_attempts, 40);
    }

    #[tokio::test]
    async fn load_writes_defaults_then_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let manager = ConfigManager::with_path(dir.path().join("pricewatch.json"));

        let mut config = manager.load().await?;
        assert_eq!(config.monitor.max_concurrent_checks, 5);

        config.monitor.scan_interval_seconds = 120;
        manager.save(&config).await?;

        let reloaded = manager.load().await?;
        assert_eq!(reloaded.monitor.scan_interval_seconds, 120);
        Ok(())
    }
}
