//! Extractor trait definition.

use crate::error::DataError;
use crate::types::RawTable;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row filters applied while extracting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractFilter {
    /// Keep only these tickers (case-insensitive). Empty keeps all.
    pub tickers: Vec<String>,
    /// Inclusive lower bound on the parsed date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the parsed date
    pub end_date: Option<NaiveDate>,
}

impl ExtractFilter {
    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty() && self.start_date.is_none() && self.end_date.is_none()
    }

    pub fn has_date_bounds(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    /// Whether a row with this ticker and parsed date passes.
    ///
    /// An unparsable date only passes when no date bound is set.
    pub fn accepts(&self, ticker: Option<&str>, date: Option<NaiveDate>) -> bool {
        if !self.tickers.is_empty() {
            let Some(ticker) = ticker else {
                return false;
            };
            let ticker = ticker.trim();
            if !self.tickers.iter().any(|t| t.eq_ignore_ascii_case(ticker)) {
                return false;
            }
        }

        if !self.has_date_bounds() {
            return true;
        }

        match date {
            Some(d) => {
                self.start_date.map_or(true, |s| d >= s) && self.end_date.map_or(true, |e| d <= e)
            }
            None => false,
        }
    }
}

/// Trait for sources of raw price tables (CSV files, market-data APIs).
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Read a raw table, applying the filter.
    ///
    /// Fails only on I/O or structural problems (missing mandatory
    /// columns, no rows); malformed cells are left for the cleaner.
    async fn extract(&self, filter: &ExtractFilter) -> Result<RawTable, DataError>;

    /// Get the extractor name.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_filter_tickers_case_insensitive() {
        let filter = ExtractFilter {
            tickers: vec!["PETR4".to_string()],
            ..Default::default()
        };

        assert!(filter.accepts(Some("petr4"), None));
        assert!(!filter.accepts(Some("VALE3"), Some(ymd(2020, 1, 1))));
        assert!(!filter.accepts(None, Some(ymd(2020, 1, 1))));
    }

    #[test]
    fn test_filter_date_bounds() {
        let filter = ExtractFilter {
            start_date: Some(ymd(2020, 1, 1)),
            end_date: Some(ymd(2020, 12, 31)),
            ..Default::default()
        };

        assert!(filter.accepts(Some("PETR4"), Some(ymd(2020, 1, 1))));
        assert!(filter.accepts(Some("PETR4"), Some(ymd(2020, 12, 31))));
        assert!(!filter.accepts(Some("PETR4"), Some(ymd(2021, 1, 1))));
        assert!(!filter.accepts(Some("PETR4"), None));
        assert!(ExtractFilter::default().accepts(None, None));
    }
}
