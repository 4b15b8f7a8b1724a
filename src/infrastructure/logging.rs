//! Logging system configuration and initialization
//!
//! Console output by default, with an optional daily-rolling file layer.
//! The non-blocking file writer's guard is kept alive for the process
//! lifetime.

use std::path::{Path, PathBuf};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use crate::infrastructure::config::LoggingConfig;

static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Get the log directory relative to the executable location.
pub fn default_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    exe_dir.join("logs")
}

/// Builds the env filter from the configured level plus per-module filters.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut directives = config.level.clone();
    for (module, level) in &config.module_filters {
        directives.push_str(&format!(",{module}={level}"));
    }

    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system from configuration.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config);
    let console_layer = fmt::layer().with_target(true);

    if config.file_output {
        let directory = config
            .directory
            .clone()
            .unwrap_or_else(default_log_directory);
        std::fs::create_dir_all(&directory)?;

        let file_appender = rolling::daily(&directory, "pricewatch.log");
        let (writer, guard) = non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
        Registry::default()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;
    } else {
        Registry::default()
            .with(filter)
            .with(console_layer)
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_includes_module_overrides() {
        let config = LoggingConfig::default();
        let filter = build_filter(&config);
        let rendered = filter.to_string();
        assert!(rendered.contains("sqlx=warn"));
    }

    #[test]
    fn invalid_level_falls_back_to_info() {
        let config = LoggingConfig {
            level: "not a level!!".to_string(),
            ..LoggingConfig::default()
        };
        let filter = build_filter(&config);
        assert_eq!(filter.to_string(), "info");
    }
}
