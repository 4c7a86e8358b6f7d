//! Full pipeline command.

use anyhow::{Context, Result};
use b3_config::AppConfig;
use b3_core::traits::Loader;
use b3_data::{CsvExtractor, CsvLoader, MemoryLoader};
use b3_monitor::JobState;
use b3_pipeline::EtlPipeline;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::{OutputFormat, RunArgs};

/// Fold command-line overrides into the pipeline section.
fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    let pipeline = &mut config.pipeline;
    if let Some(data) = &args.data {
        pipeline.input = Some(data.clone());
    }
    if !args.tickers.is_empty() {
        pipeline.tickers = args.tickers.clone();
    }
    if args.start.is_some() {
        pipeline.start_date = args.start;
    }
    if args.end.is_some() {
        pipeline.end_date = args.end;
    }
    if let Some(output) = &args.output {
        pipeline.output_dir = output.clone();
    }
    if args.skip_indicators {
        pipeline.calculate_indicators = false;
    }
}

pub async fn run(args: RunArgs, mut config: AppConfig) -> Result<()> {
    apply_overrides(&mut config, &args);
    config.validate().map_err(anyhow::Error::msg)?;

    let input = config
        .pipeline
        .input
        .clone()
        .context("No input file: pass --data or set pipeline.input")?;
    let extractor = Arc::new(
        CsvExtractor::new(&input)
            .with_context(|| format!("Cannot open input '{}'", input.display()))?,
    );

    let loader: Arc<dyn Loader> = if args.dry_run {
        info!("Dry run: results are kept in memory");
        Arc::new(MemoryLoader::new())
    } else {
        let dir = &config.pipeline.output_dir;
        Arc::new(
            CsvLoader::new(dir)
                .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?,
        )
    };

    let pipeline = EtlPipeline::from_config(&config, extractor, loader)?;
    let mut job = JobState::new();

    let report = match pipeline.run(&mut job).await {
        Ok(report) => report,
        Err(e) => {
            for entry in job.problems() {
                warn!("{entry}");
            }
            return Err(e).context(format!("ETL job {} failed", job.job_id));
        }
    };

    match args.format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    if let Some(save_path) = &args.save {
        std::fs::write(save_path, report.to_json()?)
            .with_context(|| format!("Cannot write report to '{}'", save_path.display()))?;
        info!("Report saved to {:?}", save_path);
    }

    Ok(())
}
