//! Clean command implementation.

use anyhow::{Context, Result};
use b3_config::AppConfig;
use b3_core::traits::Loader;
use b3_data::{clean_csv, CsvLoader};
use tracing::info;

use crate::cli::{CleanArgs, OutputFormat};

pub async fn run(args: CleanArgs, config: AppConfig) -> Result<()> {
    let (bars, report) = clean_csv(&args.data, config.cleaning)
        .with_context(|| format!("Failed to clean '{}'", args.data.display()))?;

    if let Some(dir) = &args.output {
        let loader = CsvLoader::new(dir)?;
        let stats = loader.load_prices(&bars).await?;
        info!(
            path = %loader.prices_path().display(),
            rows = stats.total_rows,
            "Cleaned prices written"
        );
    }

    match args.format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    Ok(())
}
