//! Default configuration command.

use anyhow::{Context, Result};
use b3_config::AppConfig;

use crate::cli::DefaultConfigArgs;

pub async fn run(args: DefaultConfigArgs) -> Result<()> {
    let text = AppConfig::default().to_toml()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Cannot write '{}'", path.display()))?;
            println!("Default configuration written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
