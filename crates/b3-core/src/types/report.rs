//! Cleaning report.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::DateRange;

/// Outlier detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Interquartile range fences
    #[default]
    Iqr,
    /// Distance from the mean in standard deviations
    ZScore,
    /// Keep every row
    None,
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr => write!(f, "iqr"),
            OutlierMethod::ZScore => write!(f, "zscore"),
            OutlierMethod::None => write!(f, "none"),
        }
    }
}

/// Population over which outlier statistics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierScope {
    /// Quartiles per ticker
    #[default]
    PerTicker,
    /// Quartiles over all tickers mixed together
    Global,
}

impl fmt::Display for OutlierScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierScope::PerTicker => write!(f, "per_ticker"),
            OutlierScope::Global => write!(f, "global"),
        }
    }
}

/// Per-stage counters of one cleaning run. Advisory only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Rows received
    pub original_rows: usize,
    /// Rows emitted
    pub cleaned_rows: usize,
    /// Rows dropped as earlier duplicates of a (date, ticker) key
    pub duplicates_removed: usize,
    /// Rows dropped for a null date, ticker or close
    pub nulls_removed: usize,
    /// Rows dropped because a date or price failed to coerce
    pub type_coercion_failures: usize,
    /// Rows whose high/low were repaired (not dropped)
    pub inconsistencies_fixed: usize,
    /// Rows dropped by the outlier filter
    pub outliers_removed: usize,
    /// Rows dropped by business rules
    pub business_rules_violations: usize,
    /// Outlier method used
    pub outlier_method: OutlierMethod,
    /// Outlier scope used
    pub outlier_scope: OutlierScope,
    /// Parsable date span of the input
    pub original_date_range: Option<DateRange>,
    /// Date span of the output
    pub cleaned_date_range: Option<DateRange>,
    /// Distinct input tickers
    pub original_tickers: usize,
    /// Distinct output tickers
    pub cleaned_tickers: usize,
}

impl CleaningReport {
    pub fn removed_rows(&self) -> usize {
        self.original_rows.saturating_sub(self.cleaned_rows)
    }

    /// Share of input rows removed, in percent with two decimals.
    pub fn removal_percentage(&self) -> f64 {
        if self.original_rows == 0 {
            return 0.0;
        }
        let pct = self.removed_rows() as f64 / self.original_rows as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let range = |r: &Option<DateRange>| {
            r.map(|r| r.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        };

        let mut s = String::new();
        s.push_str("CLEANING\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Original Rows:       {}\n", self.original_rows));
        s.push_str(&format!("  Cleaned Rows:        {}\n", self.cleaned_rows));
        s.push_str(&format!(
            "  Removed:             {} ({:.2}%)\n",
            self.removed_rows(),
            self.removal_percentage()
        ));
        s.push_str(&format!("  Duplicates:          {}\n", self.duplicates_removed));
        s.push_str(&format!("  Nulls:               {}\n", self.nulls_removed));
        s.push_str(&format!(
            "  Coercion Failures:   {}\n",
            self.type_coercion_failures
        ));
        s.push_str(&format!(
            "  Repaired OHLC:       {}\n",
            self.inconsistencies_fixed
        ));
        s.push_str(&format!(
            "  Outliers ({}/{}): {}\n",
            self.outlier_method, self.outlier_scope, self.outliers_removed
        ));
        s.push_str(&format!(
            "  Business Rules:      {}\n",
            self.business_rules_violations
        ));
        s.push_str(&format!(
            "  Tickers:             {} -> {}\n",
            self.original_tickers, self.cleaned_tickers
        ));
        s.push_str(&format!(
            "  Date Range:          {} -> {}\n",
            range(&self.original_date_range),
            range(&self.cleaned_date_range)
        ));
        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
