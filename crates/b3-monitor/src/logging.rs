//! Logging setup.

use b3_core::error::{EtlError, EtlResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging section of the application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
    /// Daily-rolling log file, written as JSON
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Reject a level that `EnvFilter` cannot parse.
    pub fn validate(&self) -> Result<(), String> {
        EnvFilter::try_new(&self.level)
            .map(|_| ())
            .map_err(|e| format!("invalid log level '{}': {e}", self.level))
    }
}

/// Split a log file path into the directory and file-name prefix the
/// rolling appender expects.
fn split_log_path(path: &Path) -> EtlResult<(PathBuf, String)> {
    let prefix = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EtlError::Config(format!("invalid log file path: {}", path.display())))?
        .to_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, prefix))
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. When a log file is
/// configured, the returned guard must be held until shutdown so buffered
/// lines get flushed.
pub fn setup_logging(config: &LoggingConfig) -> EtlResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EtlError::Config(format!("invalid log level '{}': {e}", config.level)))?;

    let console = match config.format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let (dir, prefix) = split_log_path(path)?;
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(dir, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(filter)
        .try_init()
        .map_err(|e| EtlError::Config(format!("failed to initialise logging: {e}")))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_validate_level() {
        assert!(LoggingConfig::default().validate().is_ok());
        let config = LoggingConfig {
            level: "b3_data=debug,info".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let config = LoggingConfig {
            level: "b3_data=loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_log_path() {
        let (dir, prefix) = split_log_path(Path::new("logs/etl.log")).unwrap();
        assert_eq!(dir, PathBuf::from("logs"));
        assert_eq!(prefix, "etl.log");

        let (dir, prefix) = split_log_path(Path::new("etl.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(prefix, "etl.log");
    }
}
