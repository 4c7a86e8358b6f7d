//! Inspect command implementation.

use anyhow::{Context, Result};
use b3_data::CsvExtractor;

use crate::cli::{InspectArgs, OutputFormat};

pub async fn run(args: InspectArgs) -> Result<()> {
    let metadata = CsvExtractor::new(&args.data)
        .and_then(|extractor| extractor.metadata())
        .with_context(|| format!("Failed to inspect '{}'", args.data.display()))?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&metadata)?),
        OutputFormat::Text => print!("{}", metadata.summary()),
    }

    if !metadata.missing_columns.is_empty() {
        anyhow::bail!(
            "Missing mandatory columns: {}",
            metadata.missing_columns.join(", ")
        );
    }

    Ok(())
}
