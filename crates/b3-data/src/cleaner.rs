//! Data cleaning.
//!
//! [`DataCleaner`] turns a raw table into consistent price bars through six
//! stages applied in a fixed order:
//!
//! 1. duplicate resolution on `(date, ticker)`, last row wins
//! 2. null handling: drop rows without date, ticker or close, then fill
//!    open/high/low/volume forward and backward within each ticker
//! 3. type coercion: parse dates and numbers, drop rows that fail
//! 4. OHLC repair: widen high and low to cover open and close
//! 5. outlier rejection on the price columns
//! 6. business rules: positive prices, non-negative volume, no future dates
//!
//! Malformed rows never produce errors. Only an empty table or a missing
//! mandatory column does.

use b3_core::error::DataError;
use b3_core::types::{
    parse_date, CleaningReport, Column, DateRange, OutlierMethod, OutlierScope, PriceBar,
    RawRecord, RawTable,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, info};

use crate::outliers::{Observation, OutlierFilter};

/// Cleaning configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningSettings {
    pub outlier_method: OutlierMethod,
    pub outlier_scope: OutlierScope,
    /// Fence width in IQRs
    pub iqr_multiplier: f64,
    /// Rejection threshold in standard deviations
    pub zscore_threshold: f64,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        Self {
            outlier_method: OutlierMethod::Iqr,
            outlier_scope: OutlierScope::PerTicker,
            iqr_multiplier: 1.5,
            zscore_threshold: 3.0,
        }
    }
}

impl CleaningSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.iqr_multiplier > 0.0) {
            return Err(format!(
                "iqr_multiplier must be positive, got {}",
                self.iqr_multiplier
            ));
        }
        if !(self.zscore_threshold > 0.0) {
            return Err(format!(
                "zscore_threshold must be positive, got {}",
                self.zscore_threshold
            ));
        }
        Ok(())
    }

    pub fn outlier_filter(&self) -> OutlierFilter {
        OutlierFilter {
            method: self.outlier_method,
            scope: self.outlier_scope,
            iqr_multiplier: self.iqr_multiplier,
            zscore_threshold: self.zscore_threshold,
        }
    }
}

/// A row after type coercion. Volume may still be missing.
#[derive(Debug, Clone)]
struct Candidate {
    date: NaiveDate,
    ticker: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<f64>,
    extra: BTreeMap<String, String>,
}

impl Observation for Candidate {
    fn ticker(&self) -> &str {
        &self.ticker
    }

    fn price(&self, column: Column) -> f64 {
        match column {
            Column::Open => self.open,
            Column::High => self.high,
            Column::Low => self.low,
            _ => self.close,
        }
    }
}

impl Candidate {
    fn into_bar(self) -> Option<PriceBar> {
        let volume = self.volume?;
        let mut bar = PriceBar::new(
            self.date,
            self.ticker,
            self.open,
            self.high,
            self.low,
            self.close,
            volume.round() as u64,
        );
        bar.extra = self.extra;
        Some(bar)
    }
}

/// Turns raw OHLCV tables into clean price bars.
#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    settings: CleaningSettings,
    reference_date: Option<NaiveDate>,
}

impl DataCleaner {
    pub fn new(settings: CleaningSettings) -> Self {
        Self {
            settings,
            reference_date: None,
        }
    }

    /// Fix the day used by the future-date rule instead of today (UTC).
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn settings(&self) -> &CleaningSettings {
        &self.settings
    }

    /// Clean a raw table. The input is left untouched.
    ///
    /// Output is sorted by `(date, ticker)`.
    pub fn clean(&self, table: &RawTable) -> Result<(Vec<PriceBar>, CleaningReport), DataError> {
        table.validate_structure("cleaning")?;

        let start = Instant::now();
        let mut report = CleaningReport {
            original_rows: table.len(),
            outlier_method: self.settings.outlier_method,
            outlier_scope: self.settings.outlier_scope,
            original_date_range: DateRange::covering(
                table
                    .records
                    .iter()
                    .filter_map(|r| r.get(Column::Date).and_then(parse_date)),
            ),
            original_tickers: table.distinct_tickers().len(),
            ..Default::default()
        };
        info!(rows = table.len(), "Starting data cleaning");

        let rows = remove_duplicates(&table.records, &mut report);
        let rows = handle_missing_values(rows, &mut report);
        let rows = coerce_types(rows, &mut report);
        let rows = fix_inconsistencies(rows, &mut report);
        let mut bars = self.filter_rows(rows, &mut report);

        bars.sort_by(|a, b| a.key().cmp(&b.key()));

        report.cleaned_rows = bars.len();
        report.cleaned_date_range = DateRange::covering(bars.iter().map(|b| b.date));
        report.cleaned_tickers = bars
            .iter()
            .map(|b| b.ticker.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        info!(
            original = report.original_rows,
            cleaned = report.cleaned_rows,
            removed = report.removed_rows(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Data cleaning complete"
        );
        Ok((bars, report))
    }

    /// Clean bars that were already typed, e.g. a previous cleaning output.
    pub fn clean_bars(&self, bars: &[PriceBar]) -> Result<(Vec<PriceBar>, CleaningReport), DataError> {
        self.clean(&to_raw_table(bars))
    }

    /// Stages 5 and 6.
    ///
    /// Outlier rejection repeats over the survivors until a round removes
    /// nothing, and runs again whenever the business rules drop rows, so a
    /// second cleaning pass over the output removes nothing further.
    fn filter_rows(&self, mut rows: Vec<Candidate>, report: &mut CleaningReport) -> Vec<PriceBar> {
        let today = self
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());

        loop {
            rows = self.remove_outliers(rows, report);
            let before = rows.len();
            rows.retain(|r| passes_business_rules(r, today));
            let rejected = before - rows.len();
            report.business_rules_violations += rejected;
            debug!(
                removed = rejected,
                reference_date = %today,
                "Business rules validated"
            );
            if rejected == 0 || rows.is_empty() {
                break;
            }
        }

        rows.into_iter().filter_map(Candidate::into_bar).collect()
    }

    fn remove_outliers(&self, mut rows: Vec<Candidate>, report: &mut CleaningReport) -> Vec<Candidate> {
        let filter = self.settings.outlier_filter();
        let (mut rounds, mut total) = (0usize, 0usize);
        loop {
            let before = rows.len();
            rows = filter.apply(rows);
            let removed = before - rows.len();
            total += removed;
            rounds += 1;
            if removed == 0 {
                break;
            }
        }
        report.outliers_removed += total;
        debug!(
            removed = total,
            rounds,
            method = %self.settings.outlier_method,
            scope = %self.settings.outlier_scope,
            "Outliers removed"
        );
        rows
    }
}

/// Positive prices, a present non-negative volume, and no date after `today`.
fn passes_business_rules(row: &Candidate, today: NaiveDate) -> bool {
    row.open > 0.0
        && row.high > 0.0
        && row.low > 0.0
        && row.close > 0.0
        && row.date <= today
        && row.volume.is_some_and(|v| v >= 0.0)
}

fn normalized_ticker(record: &RawRecord) -> Option<String> {
    record.get(Column::Ticker).map(|t| t.trim().to_uppercase())
}

/// Stage 1: keep the last row of every `(date, ticker)` key, in input order.
fn remove_duplicates(records: &[RawRecord], report: &mut CleaningReport) -> Vec<RawRecord> {
    let key = |r: &RawRecord| {
        let date = r.get(Column::Date).map(|d| {
            parse_date(d)
                .map(|d| d.to_string())
                .unwrap_or_else(|| d.trim().to_string())
        });
        (date, normalized_ticker(r))
    };

    let mut last: HashMap<(Option<String>, Option<String>), usize> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        last.insert(key(record), idx);
    }

    let rows: Vec<RawRecord> = records
        .iter()
        .enumerate()
        .filter(|(idx, r)| last.get(&key(r)) == Some(idx))
        .map(|(_, r)| r.clone())
        .collect();

    report.duplicates_removed = records.len() - rows.len();
    debug!(removed = report.duplicates_removed, "Duplicates removed");
    rows
}

/// Stage 2: drop rows missing a critical column and fill the others.
fn handle_missing_values(rows: Vec<RawRecord>, report: &mut CleaningReport) -> Vec<RawRecord> {
    let before = rows.len();
    let mut rows: Vec<RawRecord> = rows
        .into_iter()
        .filter(|r| {
            r.get(Column::Date).is_some()
                && r.get(Column::Ticker).is_some()
                && r.get(Column::Close).is_some()
        })
        .collect();
    report.nulls_removed = before - rows.len();

    // Chronological row order per ticker; unparsable dates go last.
    let mut by_ticker: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(ticker) = normalized_ticker(row) {
            by_ticker.entry(ticker).or_default().push(idx);
        }
    }

    let mut filled = 0usize;
    for mut order in by_ticker.into_values() {
        order.sort_by_key(|&i| {
            let date = rows[i].get(Column::Date).and_then(parse_date);
            (date.is_none(), date)
        });
        for column in [Column::Open, Column::High, Column::Low, Column::Volume] {
            filled += fill_column(&mut rows, &order, column);
        }
    }

    debug!(
        removed = report.nulls_removed,
        filled_cells = filled,
        "Missing values handled"
    );
    rows
}

/// Forward fill then backward fill one column along `order`.
fn fill_column(rows: &mut [RawRecord], order: &[usize], column: Column) -> usize {
    let mut filled = 0;
    let mut carry: Option<String> = None;
    for &i in order {
        match rows[i].get(column) {
            Some(v) => carry = Some(v.to_string()),
            None => {
                if let Some(v) = &carry {
                    rows[i].set(column, Some(v.clone()));
                    filled += 1;
                }
            }
        }
    }

    carry = None;
    for &i in order.iter().rev() {
        match rows[i].get(column) {
            Some(v) => carry = Some(v.to_string()),
            None => {
                if let Some(v) = &carry {
                    rows[i].set(column, Some(v.clone()));
                    filled += 1;
                }
            }
        }
    }
    filled
}

fn parse_number(cell: Option<&str>) -> Option<f64> {
    cell?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Stage 3: parse dates and numbers.
fn coerce_types(rows: Vec<RawRecord>, report: &mut CleaningReport) -> Vec<Candidate> {
    let before = rows.len();
    let candidates: Vec<Candidate> = rows
        .into_iter()
        .filter_map(|r| {
            Some(Candidate {
                date: r.get(Column::Date).and_then(parse_date)?,
                ticker: normalized_ticker(&r)?,
                open: parse_number(r.get(Column::Open))?,
                high: parse_number(r.get(Column::High))?,
                low: parse_number(r.get(Column::Low))?,
                close: parse_number(r.get(Column::Close))?,
                volume: parse_number(r.get(Column::Volume)),
                extra: r.extra,
            })
        })
        .collect();

    report.type_coercion_failures = before - candidates.len();
    debug!(
        failures = report.type_coercion_failures,
        "Data types validated"
    );
    candidates
}

/// Stage 4: `high >= max(open, close)` and `low <= min(open, close)`.
fn fix_inconsistencies(mut rows: Vec<Candidate>, report: &mut CleaningReport) -> Vec<Candidate> {
    let mut fixed = 0;
    for row in &mut rows {
        let high = row.high.max(row.open).max(row.close);
        let low = row.low.min(row.open).min(row.close);
        if high != row.high || low != row.low {
            row.high = high;
            row.low = low;
            fixed += 1;
        }
    }
    report.inconsistencies_fixed = fixed;
    debug!(fixed, "Inconsistencies fixed");
    rows
}

/// Render typed bars as a raw table with the standard columns.
pub fn to_raw_table(bars: &[PriceBar]) -> RawTable {
    RawTable::from_records(
        bars.iter()
            .map(|b| {
                let mut record = RawRecord::new(
                    &b.date.to_string(),
                    &b.ticker,
                    &b.open.to_string(),
                    &b.high.to_string(),
                    &b.low.to_string(),
                    &b.close.to_string(),
                    &b.volume.to_string(),
                );
                record.extra = b.extra.clone();
                record
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    fn cleaner() -> DataCleaner {
        DataCleaner::default().with_reference_date(reference())
    }

    fn row(date: &str, ticker: &str, close: &str) -> RawRecord {
        RawRecord::new(date, ticker, close, close, close, close, "1000")
    }

    #[test]
    fn test_duplicates_last_wins() {
        let table = RawTable::from_records(vec![
            row("2020-01-01", "PETR4", "10"),
            row("2020-01-01", "PETR4", "12"),
        ]);

        let (bars, report) = cleaner().clean(&table).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 12.0);
        assert_eq!(report.duplicates_removed, 1);
    }

    #[test]
    fn test_duplicate_key_normalizes_ticker_and_date() {
        let table = RawTable::from_records(vec![
            row("2020-01-01", "petr4", "10"),
            row("2020-01-01 00:00:00", " PETR4 ", "11"),
        ]);

        let (bars, report) = cleaner().clean(&table).unwrap();
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(bars[0].ticker, "PETR4");
        assert_eq!(bars[0].close, 11.0);
    }

    #[test]
    fn test_critical_nulls_dropped() {
        let table = RawTable::from_records(vec![
            row("2020-01-02", "PETR4", "10"),
            row("2020-01-03", "PETR4", "10").without(Column::Close),
            row("2020-01-03", "VALE3", "50").without(Column::Ticker),
            row("2020-01-04", "PETR4", "10").without(Column::Date),
        ]);

        let (bars, report) = cleaner().clean(&table).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(report.nulls_removed, 3);
    }

    #[test]
    fn test_forward_and_backward_fill_within_ticker() {
        let table = RawTable::from_records(vec![
            // Input order is not chronological
            RawRecord::new("2020-01-03", "PETR4", "11", "12", "10", "11", "300"),
            RawRecord::new("2020-01-01", "PETR4", "", "", "", "10", ""),
            RawRecord::new("2020-01-02", "PETR4", "10.5", "11", "10", "10.5", "200"),
            RawRecord::new("2020-01-04", "PETR4", "", "12", "10", "11.5", ""),
            RawRecord::new("2020-01-04", "VALE3", "50", "50", "50", "50", ""),
        ]);

        let (bars, report) = cleaner().clean(&table).unwrap();
        let petr: Vec<&PriceBar> = bars.iter().filter(|b| b.ticker == "PETR4").collect();

        assert_eq!(petr.len(), 4);
        // Leading gap takes the next known value
        assert_eq!(petr[0].open, 10.5);
        assert_eq!(petr[0].volume, 200);
        // Trailing gap takes the previous known value
        assert_eq!(petr[3].open, 11.0);
        assert_eq!(petr[3].volume, 300);
        // A ticker with no volume at all stays null and fails business rules
        assert!(bars.iter().all(|b| b.ticker != "VALE3"));
        assert_eq!(report.business_rules_violations, 1);
        assert_eq!(report.nulls_removed, 0);
    }

    #[test]
    fn test_type_coercion_failures() {
        let table = RawTable::from_records(vec![
            row("2020-01-02", "PETR4", "10"),
            row("not a date", "PETR4", "10"),
            RawRecord::new("2020-01-03", "PETR4", "abc", "10", "10", "10", "1"),
            RawRecord::new("2020-01-04", "PETR4", "10", "NaN", "10", "10", "1"),
        ]);

        let (bars, report) = cleaner().clean(&table).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(report.type_coercion_failures, 3);
    }

    #[test]
    fn test_ohlc_repair() {
        let table = RawTable::from_records(vec![RawRecord::new(
            "2020-01-02", "PETR4", "10", "9", "11", "12", "100",
        )]);

        let (bars, report) = cleaner().clean(&table).unwrap();
        assert_eq!(report.inconsistencies_fixed, 1);
        assert_eq!(bars[0].high, 12.0);
        assert_eq!(bars[0].low, 10.0);
        assert!(bars[0].is_consistent());
    }

    #[test]
    fn test_negative_close_is_business_rule_violation() {
        let table = RawTable::from_records(vec![
            row("2020-01-01", "PETR4", "-5"),
            row("2020-01-02", "PETR4", "2"),
            row("2020-01-03", "PETR4", "6"),
            row("2020-01-06", "PETR4", "10"),
            row("2020-01-07", "PETR4", "14"),
        ]);

        let (bars, report) = cleaner().clean(&table).unwrap();
        assert_eq!(report.outliers_removed, 0);
        assert_eq!(report.business_rules_violations, 1);
        assert_eq!(bars.len(), 4);
        assert!(bars.iter().all(|b| b.close > 0.0));
    }

    #[test]
    fn test_negative_volume_and_future_date() {
        let table = RawTable::from_records(vec![
            row("2020-01-02", "PETR4", "10"),
            RawRecord::new("2020-01-03", "PETR4", "10", "10", "10", "10", "-1"),
            row("2025-01-02", "PETR4", "10"),
        ]);

        let (bars, report) = cleaner().clean(&table).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(report.business_rules_violations, 2);
    }

    #[test]
    fn test_structural_errors() {
        let empty = RawTable::from_records(Vec::new());
        assert!(matches!(
            cleaner().clean(&empty),
            Err(DataError::EmptyDataset { .. })
        ));

        let schema = b3_core::types::InputSchema::from_headers(&["date", "ticker", "close"]);
        let table = RawTable::new(schema, vec![row("2020-01-02", "PETR4", "10")]);
        assert!(matches!(
            cleaner().clean(&table),
            Err(DataError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_input_not_mutated_and_extras_kept() {
        let table = RawTable::from_records(vec![
            RawRecord::new("2020-01-02", "petr4", "", "11", "9", "10", "100").with_extra("source", "b3"),
            RawRecord::new("2020-01-03", "petr4", "10", "11", "9", "10.5", "100"),
        ]);
        let snapshot = table.clone();

        let (bars, _) = cleaner().clean(&table).unwrap();
        assert_eq!(table, snapshot);
        assert_eq!(bars[0].extra.get("source").map(String::as_str), Some("b3"));
    }

    #[test]
    fn test_report_ranges() {
        let table = RawTable::from_records(vec![
            row("2020-01-02", "PETR4", "10"),
            row("2020-01-03", "VALE3", "50"),
            row("2020-01-06", "VALE3", "-1"),
        ]);

        let (_, report) = cleaner().clean(&table).unwrap();
        assert_eq!(report.original_tickers, 2);
        assert_eq!(report.cleaned_tickers, 2);
        assert_eq!(report.original_date_range.unwrap().end, NaiveDate::from_ymd_opt(2020, 1, 6).unwrap());
        assert_eq!(report.cleaned_date_range.unwrap().end, NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
        assert_eq!(report.removal_percentage(), 33.33);
    }

    #[test]
    fn test_settings_validation() {
        assert!(CleaningSettings::default().validate().is_ok());
        let bad = CleaningSettings {
            iqr_multiplier: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
