//! Core traits for the ETL pipeline.

mod extractor;
mod indicator;
mod loader;

pub use extractor::{ExtractFilter, Extractor};
pub use indicator::{Indicator, MultiOutputIndicator, OhlcvIndicator};
pub use loader::{LoadStats, Loader};
