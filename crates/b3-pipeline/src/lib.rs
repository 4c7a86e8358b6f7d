//! End-to-end ETL pipeline over B3 price data.

mod engine;
mod report;
mod statistics;

pub use engine::EtlPipeline;
pub use report::PipelineReport;
pub use statistics::{PipelineStats, StageTiming};
