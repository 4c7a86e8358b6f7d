//! CLI definitions.

pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "b3-etl")]
#[command(author, version, about = "ETL pipeline for B3 historical stock prices")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "B3ETL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overriding the configuration file
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline: extract, clean, compute indicators, load
    Run(RunArgs),
    /// Clean a CSV file and print the cleaning report
    Clean(CleanArgs),
    /// Print metadata of a CSV file
    Inspect(InspectArgs),
    /// List the configured indicator columns
    Indicators,
    /// Validate configuration
    ValidateConfig,
    /// Print the default configuration as TOML
    DefaultConfig(DefaultConfigArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Input CSV file
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Tickers to keep (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Start date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Output directory for the loaded tables
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip indicator calculation
    #[arg(long)]
    pub skip_indicators: bool,

    /// Load into memory instead of writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Save the JSON report to a file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct CleanArgs {
    /// Input CSV file
    #[arg(short, long)]
    pub data: PathBuf,

    /// Directory to write the cleaned prices table to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// Input CSV file
    #[arg(short, long)]
    pub data: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(clap::Args)]
pub struct DefaultConfigArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_args() {
        let cli = Cli::try_parse_from([
            "b3-etl",
            "--log-level",
            "debug",
            "run",
            "--data",
            "prices.csv",
            "-S",
            "PETR4,VALE3",
            "--start",
            "2020-01-01",
            "--skip-indicators",
            "--format",
            "json",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.tickers, vec!["PETR4", "VALE3"]);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert!(args.skip_indicators);
        assert!(args.format == OutputFormat::Json);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(Cli::try_parse_from(["b3-etl", "run", "--start", "01/13/2020"]).is_err());
    }
}
