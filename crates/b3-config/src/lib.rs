//! Configuration management.

mod settings;

pub use settings::{AppConfig, AppSettings, PipelineSettings};

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use std::path::Path;

/// Prefix of environment overrides, e.g. `B3ETL__PIPELINE__OUTPUT_DIR`.
pub const ENV_PREFIX: &str = "B3ETL";

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("pipeline.tickers")
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = builder.add_source(environment()).build()?.try_deserialize()?;
    config.validate().map_err(ConfigError::Message)?;
    Ok(config)
}

/// Load configuration from file and environment.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    build(Config::builder().add_source(File::from(path).required(true)))
}

/// Load from `path` when given, otherwise from defaults and environment.
pub fn load_optional(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => build(Config::builder()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_file() {
        let file = write_toml(
            r#"
            [app]
            name = "etl-test"
            environment = "test"

            [logging]
            level = "debug"
            format = "json"

            [indicators]
            ma_periods = [5, 20]
            parallel = false
            "#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.app.name, "etl-test");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.indicators.ma_periods, vec![5, 20]);
        assert!(!config.indicators.parallel);
        assert_eq!(config.indicators.atr_period, 14);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_toml("[indicators]\nmacd_fast = 30\nmacd_slow = 26\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("MACD"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config(Path::new("/no/such/config.toml")).is_err());
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_optional(None).unwrap();
        assert_eq!(config.pipeline.output_dir, Path::new("output"));
    }
}
