//! Core data types for the ETL pipeline.

mod dates;
mod indicator_row;
mod ohlcv;
mod raw;
mod report;

pub use dates::{parse_date, DateRange};
pub use indicator_row::IndicatorRow;
pub use ohlcv::{PreciseBar, PriceBar, TimeSeries, PRICE_SCALE};
pub use raw::{Column, InputSchema, RawRecord, RawTable};
pub use report::{CleaningReport, OutlierMethod, OutlierScope};
