//! Validate configuration command.

use anyhow::Result;
use b3_config::load_optional;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) => println!("Validating configuration: {:?}", path),
        None => println!("Validating default configuration with environment overrides"),
    }

    match load_optional(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!(
                "Outliers: {} ({})",
                config.cleaning.outlier_method, config.cleaning.outlier_scope
            );
            println!("Indicators enabled: {}", config.pipeline.calculate_indicators);
            println!("Moving averages: {:?}", config.indicators.ma_periods);
            println!("RSI periods: {:?}", config.indicators.rsi_periods);
            println!("Output directory: {}", config.pipeline.output_dir.display());
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
