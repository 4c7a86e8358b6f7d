//! B3 ETL command-line application.

mod cli;

use anyhow::{Context, Result};
use b3_config::load_optional;
use b3_monitor::{setup_logging, LogFormat};
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that inspect the configuration itself run before it is loaded
    let command = match cli.command {
        Commands::ValidateConfig => {
            return cli::commands::validate::run(cli.config.as_deref()).await
        }
        Commands::DefaultConfig(args) => return cli::commands::default_config::run(args).await,
        command => command,
    };

    let mut config = load_optional(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    if let Some(level) = cli.log_level {
        config.logging.level = level.as_str().to_string();
    }
    if cli.json_logs {
        config.logging.format = LogFormat::Json;
    }
    let _log_guard = setup_logging(&config.logging).context("Failed to set up logging")?;

    match command {
        Commands::Run(args) => cli::commands::run::run(args, config).await,
        Commands::Clean(args) => cli::commands::clean::run(args, config).await,
        Commands::Inspect(args) => cli::commands::inspect::run(args).await,
        Commands::Indicators => cli::commands::indicators::run(config).await,
        Commands::ValidateConfig | Commands::DefaultConfig(_) => Ok(()),
    }
}
