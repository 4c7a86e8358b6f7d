//! OHLCV (Open, High, Low, Close, Volume) data types.

use crate::error::LoadError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One cleaned daily observation for a ticker.
/// Prices are f64 for fast indicator calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading day
    pub date: NaiveDate,
    /// Upper-cased instrument symbol
    pub ticker: String,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: u64,
    /// Input columns outside the OHLCV schema, carried through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl PriceBar {
    /// Create a new bar.
    pub fn new(
        date: NaiveDate,
        ticker: impl Into<String>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            date,
            ticker: ticker.into(),
            open,
            high,
            low,
            close,
            volume,
            extra: BTreeMap::new(),
        }
    }

    /// Attach a pass-through column.
    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }

    /// Natural key of the bar.
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.ticker.as_str())
    }

    /// Calculate the typical price (HLC average).
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Calculate the bar's range (high - low).
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Volume as a float for indicator arithmetic.
    #[inline]
    pub fn volume_f64(&self) -> f64 {
        self.volume as f64
    }

    /// Calculate the true range (used for ATR).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => {
                let hl = self.high - self.low;
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => self.high - self.low,
        }
    }

    /// High covers open and close, low is under both.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }
}

/// Price bar with exact decimal prices, as written by loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreciseBar {
    pub date: NaiveDate,
    pub ticker: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// Prices are stored with two decimal places.
pub const PRICE_SCALE: u32 = 2;

impl TryFrom<&PriceBar> for PreciseBar {
    type Error = LoadError;

    /// Fails on a price `Decimal` cannot represent (non-finite or out of range).
    fn try_from(bar: &PriceBar) -> Result<Self, Self::Error> {
        let price = |column: &str, v: f64| {
            Decimal::try_from(v)
                .map(|d| d.round_dp(PRICE_SCALE))
                .map_err(|_| LoadError::InvalidPrice {
                    date: bar.date,
                    ticker: bar.ticker.clone(),
                    column: column.to_string(),
                    value: v,
                })
        };
        Ok(Self {
            date: bar.date,
            ticker: bar.ticker.clone(),
            open: price("open", bar.open)?,
            high: price("high", bar.high)?,
            low: price("low", bar.low)?,
            close: price("close", bar.close)?,
            volume: bar.volume,
        })
    }
}

/// Chronological bars of a single ticker.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    /// Ticker shared by every bar
    pub ticker: String,
    bars: Vec<PriceBar>,
}

impl TimeSeries {
    /// Build a series, sorting the bars by date (stable).
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    /// Split a mixed table into one series per ticker, ordered by ticker.
    pub fn group(bars: &[PriceBar]) -> Vec<TimeSeries> {
        let mut by_ticker: BTreeMap<&str, Vec<PriceBar>> = BTreeMap::new();
        for bar in bars {
            by_ticker
                .entry(bar.ticker.as_str())
                .or_default()
                .push(bar.clone());
        }
        by_ticker
            .into_iter()
            .map(|(ticker, bars)| TimeSeries::new(ticker, bars))
            .collect()
    }

    /// Get the number of bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Check if the series is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Get all bars as a slice.
    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    /// Extract close prices as a vector.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Extract high prices as a vector.
    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    /// Extract low prices as a vector.
    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Extract volumes as a vector.
    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume_f64()).collect()
    }

    /// Extract typical prices as a vector.
    pub fn typical_prices(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.typical_price()).collect()
    }
}
