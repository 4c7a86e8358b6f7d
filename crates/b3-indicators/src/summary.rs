//! Coverage summary of a computed indicator table.

use b3_core::types::IndicatorRow;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Indicator family, derived from the column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorCategory {
    Returns,
    MovingAverages,
    Volatility,
    Momentum,
    Volume,
    Other,
}

impl IndicatorCategory {
    pub fn of(column: &str) -> Self {
        // volume_sma_* is a volume indicator, not a moving average of price
        if column.starts_with("volume_") || matches!(column, "obv" | "vpt" | "mfi") {
            return IndicatorCategory::Volume;
        }
        if column.contains("return") {
            IndicatorCategory::Returns
        } else if column.starts_with("sma_")
            || column.starts_with("ema_")
            || column.starts_with("price_vs_sma_")
        {
            IndicatorCategory::MovingAverages
        } else if column.starts_with("volatility_")
            || column.starts_with("atr_")
            || column.starts_with("bb_")
            || column == "tr"
        {
            IndicatorCategory::Volatility
        } else if column.starts_with("rsi_")
            || column.starts_with("macd")
            || column.starts_with("stoch_")
            || column == "williams_r"
        {
            IndicatorCategory::Momentum
        } else {
            IndicatorCategory::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorCategory::Returns => "returns",
            IndicatorCategory::MovingAverages => "moving_averages",
            IndicatorCategory::Volatility => "volatility",
            IndicatorCategory::Momentum => "momentum",
            IndicatorCategory::Volume => "volume",
            IndicatorCategory::Other => "other",
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group column names by category, keeping their order inside a group.
pub fn categorize<'a>(
    columns: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<IndicatorCategory, Vec<String>> {
    let mut groups: BTreeMap<IndicatorCategory, Vec<String>> = BTreeMap::new();
    for column in columns {
        groups
            .entry(IndicatorCategory::of(column))
            .or_default()
            .push(column.to_string());
    }
    groups
}

/// What was computed and how much of it is non-null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub total_indicators: usize,
    pub categories: BTreeMap<IndicatorCategory, Vec<String>>,
    pub data_points: usize,
    pub tickers: usize,
    /// Non-null values per column
    pub coverage: BTreeMap<String, usize>,
}

impl IndicatorSummary {
    pub fn from_rows(rows: &[IndicatorRow], columns: &[String]) -> Self {
        let mut coverage: BTreeMap<String, usize> =
            columns.iter().map(|c| (c.clone(), 0)).collect();
        let mut tickers = BTreeSet::new();

        for row in rows {
            tickers.insert(row.ticker());
            for (name, count) in coverage.iter_mut() {
                if row.get(name).is_some() {
                    *count += 1;
                }
            }
        }

        Self {
            total_indicators: columns.len(),
            categories: categorize(columns.iter().map(String::as_str)),
            data_points: rows.len(),
            tickers: tickers.len(),
            coverage,
        }
    }

    /// Share of rows with a value for `column`, in percent.
    pub fn coverage_pct(&self, column: &str) -> Option<f64> {
        let count = *self.coverage.get(column)?;
        if self.data_points == 0 {
            return Some(0.0);
        }
        Some(count as f64 / self.data_points as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use b3_core::types::PriceBar;
    use chrono::NaiveDate;

    #[test]
    fn test_categories() {
        assert_eq!(IndicatorCategory::of("volume_sma_20"), IndicatorCategory::Volume);
        assert_eq!(IndicatorCategory::of("sma_20"), IndicatorCategory::MovingAverages);
        assert_eq!(IndicatorCategory::of("price_vs_sma_5_pct"), IndicatorCategory::MovingAverages);
        assert_eq!(IndicatorCategory::of("cumulative_return"), IndicatorCategory::Returns);
        assert_eq!(IndicatorCategory::of("bb_width"), IndicatorCategory::Volatility);
        assert_eq!(IndicatorCategory::of("tr"), IndicatorCategory::Volatility);
        assert_eq!(IndicatorCategory::of("macd_signal"), IndicatorCategory::Momentum);
        assert_eq!(IndicatorCategory::of("mfi"), IndicatorCategory::Volume);
        assert_eq!(IndicatorCategory::of("custom"), IndicatorCategory::Other);
    }

    #[test]
    fn test_summary_coverage() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let mut a = IndicatorRow::new(PriceBar::new(date, "PETR4", 1.0, 1.0, 1.0, 1.0, 1));
        a.set("sma_5", None);
        a.set("obv", Some(1.0));
        let mut b = IndicatorRow::new(PriceBar::new(date, "VALE3", 1.0, 1.0, 1.0, 1.0, 1));
        b.set("sma_5", Some(1.0));
        b.set("obv", Some(1.0));

        let columns = vec!["sma_5".to_string(), "obv".to_string()];
        let summary = IndicatorSummary::from_rows(&[a, b], &columns);

        assert_eq!(summary.total_indicators, 2);
        assert_eq!(summary.tickers, 2);
        assert_eq!(summary.coverage["sma_5"], 1);
        assert_eq!(summary.coverage_pct("obv"), Some(100.0));
        assert_eq!(summary.categories[&IndicatorCategory::Volume], vec!["obv"]);
    }
}
