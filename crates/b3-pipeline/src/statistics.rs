//! Pipeline run statistics.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wall time of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub millis: u64,
}

/// Row counts and timings of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Rows returned by the extractor
    pub extracted_rows: usize,
    /// Rows surviving the cleaner
    pub cleaned_rows: usize,
    /// Rows in the indicator table
    pub indicator_rows: usize,
    /// Indicator columns computed
    pub indicator_columns: usize,
    /// Stages in execution order
    pub stage_timings: Vec<StageTiming>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record how long `stage` took.
    pub fn record_stage(&mut self, stage: &str, elapsed: Duration) {
        self.stage_timings.push(StageTiming {
            stage: stage.to_string(),
            millis: elapsed.as_millis() as u64,
        });
    }

    pub fn stage_millis(&self, stage: &str) -> Option<u64> {
        self.stage_timings
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.millis)
    }

    pub fn total_millis(&self) -> u64 {
        self.stage_timings.iter().map(|t| t.millis).sum()
    }

    /// Extracted rows per second over the whole run.
    pub fn throughput(&self) -> f64 {
        let total = self.total_millis();
        if total == 0 {
            return 0.0;
        }
        self.extracted_rows as f64 / (total as f64 / 1000.0)
    }

    /// Indicator values computed (rows times columns).
    pub fn indicator_cells(&self) -> usize {
        self.indicator_rows * self.indicator_columns
    }
}
