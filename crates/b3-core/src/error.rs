//! Error types for the ETL pipeline.
//!
//! Only structural problems are errors. Malformed rows and degenerate
//! numeric cases are absorbed by the stage that meets them (dropped,
//! filled, or turned into a null value) and never show up here.

use chrono::NaiveDate;
use thiserror::Error;

/// Top-level pipeline error.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EtlError {
    /// Whether the error was caused by the shape of the input table.
    pub fn is_structural(&self) -> bool {
        matches!(self, EtlError::Data(e) if e.is_structural())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(e: serde_json::Error) -> Self {
        EtlError::Serialization(e.to_string())
    }
}

/// Input data errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Missing mandatory columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Empty dataset at {stage}")]
    EmptyDataset { stage: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl DataError {
    /// Structural input errors abort the stage; everything else is I/O.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DataError::MissingColumns { .. } | DataError::EmptyDataset { .. }
        )
    }

    pub fn empty(stage: impl Into<String>) -> Self {
        DataError::EmptyDataset {
            stage: stage.into(),
        }
    }
}

/// Indicator configuration errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Loader errors.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Parse error in {table}: {message}")]
    Parse { table: String, message: String },

    #[error("Price {column}={value} of {ticker} on {date} cannot be stored")]
    InvalidPrice {
        date: NaiveDate,
        ticker: String,
        column: String,
        value: f64,
    },
}

/// Result type alias for pipeline operations.
pub type EtlResult<T> = Result<T, EtlError>;
