//! Indicator output rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::PriceBar;

/// A cleaned bar widened with its indicator values.
///
/// A `None` value means the lookback window was too short or the
/// formula's denominator was degenerate at this bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(flatten)]
    pub bar: PriceBar,
    pub indicators: BTreeMap<String, Option<f64>>,
}

impl IndicatorRow {
    pub fn new(bar: PriceBar) -> Self {
        Self {
            bar,
            indicators: BTreeMap::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }

    pub fn ticker(&self) -> &str {
        &self.bar.ticker
    }

    /// Value of an indicator, `None` when null or not computed.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied().flatten()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Option<f64>) {
        // Non-finite results are treated as degenerate.
        let value = value.filter(|v| v.is_finite());
        self.indicators.insert(name.into(), value);
    }

    /// Whether at least one indicator is non-null.
    pub fn has_any_value(&self) -> bool {
        self.indicators.values().any(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_filters_non_finite() {
        let bar = PriceBar::new(
            NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            "PETR4",
            10.0,
            11.0,
            9.0,
            10.5,
            100,
        );
        let mut row = IndicatorRow::new(bar);
        assert!(!row.has_any_value());

        row.set("rsi_14", Some(f64::INFINITY));
        row.set("bb_width", Some(f64::NAN));
        assert!(!row.has_any_value());
        assert_eq!(row.get("rsi_14"), None);

        row.set("sma_5", Some(10.2));
        assert!(row.has_any_value());
        assert_eq!(row.get("sma_5"), Some(10.2));
        assert_eq!(row.get("missing"), None);
    }
}
