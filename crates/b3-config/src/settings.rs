//! Configuration structures.

use b3_data::CleaningSettings;
use b3_indicators::IndicatorSettings;
use b3_monitor::LoggingConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub cleaning: CleaningSettings,
    #[serde(default)]
    pub indicators: IndicatorSettings,
}

impl AppConfig {
    /// Check every section, returning the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.logging.validate()?;
        self.cleaning.validate()?;
        self.indicators.validate().map_err(|e| e.to_string())?;
        self.pipeline.validate()
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "b3-etl".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// What the pipeline reads, where it writes, and which rows it keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Source CSV file
    pub input: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Ticker filter; empty keeps every ticker
    pub tickers: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub calculate_indicators: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: PathBuf::from("output"),
            tickers: Vec::new(),
            start_date: None,
            end_date: None,
            calculate_indicators: true,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(format!("start_date {start} is after end_date {end}"));
            }
        }
        if self.tickers.iter().any(|t| t.trim().is_empty()) {
            return Err("tickers must not contain empty entries".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use b3_core::types::OutlierMethod;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_date_range() {
        let mut config = AppConfig::default();
        config.pipeline.start_date = NaiveDate::from_ymd_opt(2021, 1, 1);
        config.pipeline.end_date = NaiveDate::from_ymd_opt(2020, 1, 1);
        let err = config.validate().unwrap_err();
        assert!(err.contains("after end_date"));
    }

    #[test]
    fn test_rejects_bad_indicator_and_cleaning_values() {
        let mut config = AppConfig::default();
        config.indicators.ma_periods = vec![5, 0];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.indicators.macd_fast = 26;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cleaning.iqr_multiplier = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[indicators]"));
        assert!(text.contains("outlier_method = \"iqr\""));

        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [cleaning]
            outlier_method = "zscore"

            [pipeline]
            tickers = ["PETR4"]
            start_date = "2020-01-01"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.cleaning.outlier_method, OutlierMethod::ZScore);
        assert_eq!(parsed.cleaning.iqr_multiplier, 1.5);
        assert_eq!(parsed.pipeline.tickers, vec!["PETR4".to_string()]);
        assert!(parsed.pipeline.calculate_indicators);
        assert_eq!(parsed.indicators.rsi_periods, vec![14, 21]);
    }
}
