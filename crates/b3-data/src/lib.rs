//! Extraction, cleaning and loading of B3 price data.
//!
//! - [`CsvExtractor`] reads raw OHLCV tables
//! - [`DataCleaner`] turns them into consistent [`PriceBar`]s
//! - [`MemoryLoader`] and [`CsvLoader`] persist pipeline output

pub mod cleaner;
pub mod csv_source;
pub mod loader;
pub mod outliers;

pub use cleaner::{to_raw_table, CleaningSettings, DataCleaner};
pub use csv_source::{read_table, CsvExtractor, CsvMetadata};
pub use loader::{CsvLoader, MemoryLoader, RowKey, INDICATORS_TABLE, PRICES_TABLE};
pub use outliers::{IqrFence, Observation, OutlierFilter};

use b3_core::error::DataError;
use b3_core::types::{CleaningReport, PriceBar};
use std::path::Path;

/// Read and clean a CSV file in one call.
pub fn clean_csv(
    path: impl AsRef<Path>,
    settings: CleaningSettings,
) -> Result<(Vec<PriceBar>, CleaningReport), DataError> {
    let extractor = CsvExtractor::new(path)?;
    DataCleaner::new(settings).clean(&extractor.read_all()?)
}
