//! List configured indicators.

use anyhow::Result;
use b3_config::AppConfig;
use b3_indicators::{categorize, IndicatorEngine};

pub async fn run(config: AppConfig) -> Result<()> {
    let engine = IndicatorEngine::new(config.indicators)?;
    let columns = engine.columns();

    println!("Configured Indicators");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for (category, names) in categorize(columns.iter().map(String::as_str)) {
        println!("  {} ({})", category, names.len());
        println!("  ───────────────────────────────────────────────────────");
        for name in names {
            println!("    {name}");
        }
        println!();
    }

    println!("Total: {} columns", columns.len());

    Ok(())
}
