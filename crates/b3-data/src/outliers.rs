//! Outlier rejection over the price columns.

use b3_core::types::{Column, OutlierMethod, OutlierScope, PriceBar};
use std::collections::BTreeMap;

/// A row the outlier filter can inspect.
pub trait Observation {
    fn ticker(&self) -> &str;

    /// Value of a price column. Only called for `Column::PRICES`.
    fn price(&self, column: Column) -> f64;
}

impl Observation for PriceBar {
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

/// Quantile of sorted data with linear interpolation between ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Inclusive acceptance band `[Q1 - k*IQR, Q3 + k*IQR]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFence {
    pub lower: f64,
    pub upper: f64,
}

impl IqrFence {
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let q1 = quantile(&sorted, 0.25)?;
        let q3 = quantile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Keep mask for the IQR fence.
fn iqr_mask(values: &[f64], multiplier: f64) -> Vec<bool> {
    match IqrFence::from_values(values, multiplier) {
        Some(fence) => values.iter().map(|&v| fence.contains(v)).collect(),
        None => vec![true; values.len()],
    }
}

/// Keep mask for `|z| < threshold` with the sample standard deviation.
/// A flat or single-value population keeps everything.
fn zscore_mask(values: &[f64], threshold: f64) -> Vec<bool> {
    let n = values.len();
    if n < 2 {
        return vec![true; n];
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();
    if std == 0.0 || !std.is_finite() {
        return vec![true; n];
    }
    values
        .iter()
        .map(|v| ((v - mean) / std).abs() < threshold)
        .collect()
}

/// Sequential per-column outlier filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    pub method: OutlierMethod,
    pub scope: OutlierScope,
    pub iqr_multiplier: f64,
    pub zscore_threshold: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self {
            method: OutlierMethod::Iqr,
            scope: OutlierScope::PerTicker,
            iqr_multiplier: 1.5,
            zscore_threshold: 3.0,
        }
    }
}

impl OutlierFilter {
    /// Filter open, close, high and low in turn, each over the survivors
    /// of the previous column.
    pub fn apply<T: Observation>(&self, mut rows: Vec<T>) -> Vec<T> {
        if self.method == OutlierMethod::None {
            return rows;
        }
        for column in Column::PRICES {
            let keep = self.keep_mask(&rows, column);
            let mut flags = keep.into_iter();
            rows.retain(|_| flags.next().unwrap_or(true));
        }
        rows
    }

    fn keep_mask<T: Observation>(&self, rows: &[T], column: Column) -> Vec<bool> {
        let groups: Vec<Vec<usize>> = match self.scope {
            OutlierScope::Global => vec![(0..rows.len()).collect()],
            OutlierScope::PerTicker => {
                let mut by_ticker: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
                for (idx, row) in rows.iter().enumerate() {
                    by_ticker.entry(row.ticker()).or_default().push(idx);
                }
                by_ticker.into_values().collect()
            }
        };

        let mut keep = vec![true; rows.len()];
        for indexes in groups {
            let values: Vec<f64> = indexes.iter().map(|&i| rows[i].price(column)).collect();
            let mask = match self.method {
                OutlierMethod::Iqr => iqr_mask(&values, self.iqr_multiplier),
                OutlierMethod::ZScore => zscore_mask(&values, self.zscore_threshold),
                OutlierMethod::None => continue,
            };
            for (idx, k) in indexes.into_iter().zip(mask) {
                keep[idx] = k;
            }
        }
        keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(ticker: &str, day: u32, close: f64) -> PriceBar {
        let date = NaiveDate::from_ymd_opt(2020, 1, day).unwrap();
        PriceBar::new(date, ticker, close, close, close, close, 100)
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile(&sorted, 0.75), Some(3.25));
        assert_eq!(quantile(&[5.0], 0.25), Some(5.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_iqr_fence_is_inclusive() {
        let fence = IqrFence::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0], 1.5).unwrap();
        // Q1 = 2, Q3 = 4, IQR = 2
        assert_eq!(fence.lower, -1.0);
        assert_eq!(fence.upper, 7.0);
        assert!(fence.contains(7.0));
        assert!(!fence.contains(7.01));
    }

    #[test]
    fn test_iqr_removes_spike() {
        let mut rows: Vec<PriceBar> = (1..=9).map(|d| bar("PETR4", d, 10.0 + d as f64 * 0.1)).collect();
        rows.push(bar("PETR4", 10, 500.0));

        let kept = OutlierFilter::default().apply(rows);
        assert_eq!(kept.len(), 9);
        assert!(kept.iter().all(|b| b.close < 20.0));
    }

    #[test]
    fn test_per_ticker_scope_keeps_different_price_levels() {
        let mut rows: Vec<PriceBar> = (1..=8).map(|d| bar("CHEAP3", d, 1.0 + d as f64 * 0.01)).collect();
        rows.extend((1..=2).map(|d| bar("RICH11", d, 900.0 + d as f64)));

        let per_ticker = OutlierFilter::default().apply(rows.clone());
        assert_eq!(per_ticker.len(), 10);

        let global = OutlierFilter {
            scope: OutlierScope::Global,
            ..Default::default()
        }
        .apply(rows);
        assert_eq!(global.len(), 8);
    }

    #[test]
    fn test_zscore() {
        let mut rows: Vec<PriceBar> = (1..=20).map(|d| bar("ITUB4", d, 25.0 + (d % 3) as f64 * 0.1)).collect();
        rows.push(bar("ITUB4", 21, 250.0));

        let filter = OutlierFilter {
            method: OutlierMethod::ZScore,
            ..Default::default()
        };
        let kept = filter.apply(rows);
        assert_eq!(kept.len(), 20);
    }

    #[test]
    fn test_zscore_flat_series_keeps_all() {
        let rows: Vec<PriceBar> = (1..=5).map(|d| bar("FLAT3", d, 7.0)).collect();
        let filter = OutlierFilter {
            method: OutlierMethod::ZScore,
            ..Default::default()
        };
        assert_eq!(filter.apply(rows).len(), 5);
    }

    #[test]
    fn test_method_none_keeps_everything() {
        let rows = vec![bar("A", 1, 1.0), bar("A", 2, 1_000_000.0)];
        let filter = OutlierFilter {
            method: OutlierMethod::None,
            ..Default::default()
        };
        assert_eq!(filter.apply(rows).len(), 2);
    }
}
