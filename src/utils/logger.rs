use crate::error::{BotError, Result};
use crate::utils::config::LoggingConfig;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging system
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logger(level: &str, json_output: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| BotError::Config(format!("Invalid log level {}: {}", level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json_output {
        // JSON formatting for production
        if let Some(file) = log_file {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .map_err(|e| BotError::Config(format!("Failed to open log file {}: {}", file.display(), e)))?;

            registry.with(fmt::layer().json().with_writer(file)).try_init()
        } else {
            registry.with(fmt::layer().json()).try_init()
        }
    } else {
        // Pretty formatting for development
        registry.with(fmt::layer().pretty()).try_init()
    };

    installed.map_err(|e| BotError::Config(format!("Logger already initialized: {}", e)))
}

/// Initialize logger from config
pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    let json = config.output == "json";
    let log_file = if !config.file_path.is_empty() {
        Some(Path::new(&config.file_path))
    } else {
        None
    };

    init_logger(&config.level, json, log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_reported_not_panicking() {
        let config = LoggingConfig::default();
        let _ = init_from_config(&config);
        assert!(init_from_config(&config).is_err());
    }
}
