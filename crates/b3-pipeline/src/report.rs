//! Pipeline report generation.

use b3_core::traits::LoadStats;
use b3_core::types::CleaningReport;
use b3_indicators::IndicatorSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PipelineStats;

/// Complete report of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub job_id: Uuid,
    /// Extractor name
    pub source: String,
    /// Loader name
    pub destination: String,
    pub cleaning: CleaningReport,
    /// Absent when indicators were skipped
    pub indicators: Option<IndicatorSummary>,
    pub prices_loaded: LoadStats,
    pub indicators_loaded: Option<LoadStats>,
    pub stats: PipelineStats,
}

impl PipelineReport {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     ETL PIPELINE REPORT                    \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!("  Job:                 {}\n", self.job_id));
        s.push_str(&format!("  Source:              {}\n", self.source));
        s.push_str(&format!("  Destination:         {}\n", self.destination));
        s.push('\n');

        s.push_str(&self.cleaning.summary());
        s.push('\n');

        s.push_str("INDICATORS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        match &self.indicators {
            Some(summary) => {
                s.push_str(&format!(
                    "  Columns:             {}\n",
                    summary.total_indicators
                ));
                s.push_str(&format!("  Data Points:         {}\n", summary.data_points));
                s.push_str(&format!("  Tickers:             {}\n", summary.tickers));
                for (category, columns) in &summary.categories {
                    s.push_str(&format!("  {:<21}{}\n", format!("{category}:"), columns.len()));
                }
            }
            None => s.push_str("  Skipped\n"),
        }
        s.push('\n');

        s.push_str("LOADING\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        for stats in std::iter::once(&self.prices_loaded).chain(self.indicators_loaded.as_ref()) {
            s.push_str(&format!(
                "  {:<21}{} inserted, {} updated, {} total\n",
                format!("{}:", stats.table),
                stats.inserted,
                stats.updated,
                stats.total_rows
            ));
        }
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        for timing in &self.stats.stage_timings {
            s.push_str(&format!(
                "  {:<21}{} ms\n",
                format!("{}:", timing.stage),
                timing.millis
            ));
        }
        s.push_str(&format!(
            "  Total:               {} ms\n",
            self.stats.total_millis()
        ));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report() -> PipelineReport {
        let mut stats = PipelineStats::new();
        stats.extracted_rows = 10;
        stats.record_stage("extract", Duration::from_millis(5));
        stats.record_stage("clean", Duration::from_millis(7));

        PipelineReport {
            job_id: Uuid::new_v4(),
            source: "csv".to_string(),
            destination: "memory".to_string(),
            cleaning: CleaningReport {
                original_rows: 10,
                cleaned_rows: 9,
                duplicates_removed: 1,
                ..Default::default()
            },
            indicators: None,
            prices_loaded: LoadStats {
                table: "stock_data".to_string(),
                inserted: 9,
                updated: 0,
                total_rows: 9,
            },
            indicators_loaded: None,
            stats,
        }
    }

    #[test]
    fn test_report_summary() {
        let summary = report().summary();
        assert!(summary.contains("ETL PIPELINE REPORT"));
        assert!(summary.contains("Original Rows:       10"));
        assert!(summary.contains("Skipped"));
        assert!(summary.contains("stock_data:          9 inserted, 0 updated, 9 total"));
        assert!(summary.contains("Total:               12 ms"));
    }

    #[test]
    fn test_report_json() {
        let json = report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["source"], "csv");
        assert_eq!(value["cleaning"]["duplicates_removed"], 1);
        assert!(value["indicators"].is_null());
    }
}
