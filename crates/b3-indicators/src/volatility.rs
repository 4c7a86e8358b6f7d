//! Volatility indicators.

use b3_core::traits::{Indicator, MultiOutputIndicator, OhlcvIndicator};
use b3_core::types::PriceBar;
use serde::{Deserialize, Serialize};

use crate::returns::pct_change;
use crate::rolling::{dense, rolling_mean, rolling_std, safe_div};

/// Trading days per year used to annualize daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Rolling sample standard deviation.
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
}

impl StdDev {
    /// Create a new standard deviation indicator.
    pub fn new(period: usize) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        Self { period }
    }
}

impl Indicator for StdDev {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        rolling_std(&dense(data), self.period)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Annualized historical volatility of daily returns.
///
/// Input is close prices. The first return is null, so the first value
/// appears at index `period`.
#[derive(Debug, Clone)]
pub struct Volatility {
    period: usize,
    annualization: f64,
}

impl Volatility {
    pub fn new(period: usize) -> Self {
        Self::with_annualization(period, TRADING_DAYS_PER_YEAR)
    }

    pub fn with_annualization(period: usize, days_per_year: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(days_per_year > 0.0, "Annualization must be positive");
        Self {
            period,
            annualization: days_per_year.sqrt(),
        }
    }

    /// Volatility from a precomputed return series.
    pub fn from_returns(&self, returns: &[Option<f64>]) -> Vec<Option<f64>> {
        rolling_std(returns, self.period)
            .into_iter()
            .map(|s| s.map(|s| s * self.annualization))
            .collect()
    }
}

impl Indicator for Volatility {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        self.from_returns(&pct_change(data))
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "volatility"
    }
}

/// True range: the first bar uses `high - low` only.
#[derive(Debug, Clone, Default)]
pub struct TrueRange;

impl OhlcvIndicator for TrueRange {
    type Output = f64;

    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let mut prev_close = None;
        bars.iter()
            .map(|bar| {
                let tr = bar.true_range(prev_close);
                prev_close = Some(bar.close);
                Some(tr)
            })
            .collect()
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "tr"
    }
}

/// Average True Range (ATR).
///
/// Simple rolling mean of the true range.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// Create a new ATR indicator.
    ///
    /// Common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// ATR from a precomputed true-range series.
    pub fn from_true_range(&self, tr: &[Option<f64>]) -> Vec<Option<f64>> {
        rolling_mean(tr, self.period)
    }
}

impl OhlcvIndicator for Atr {
    type Output = f64;

    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        self.from_true_range(&TrueRange.calculate(bars))
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    /// Upper band
    pub upper: f64,
    /// Middle band (SMA)
    pub middle: f64,
    /// Lower band
    pub lower: f64,
    /// Bandwidth ((upper - lower) / middle); null for a zero middle band
    pub bandwidth: Option<f64>,
    /// %B ((price - lower) / (upper - lower)); null when the bands touch
    pub percent_b: Option<f64>,
}

/// Bollinger Bands.
///
/// Consists of a middle band (SMA) with upper and lower bands
/// at a specified number of sample standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    /// Create new Bollinger Bands with default parameters (20, 2.0).
    pub fn new() -> Self {
        Self::with_params(20, 2.0)
    }

    /// Create Bollinger Bands with custom parameters.
    pub fn with_params(period: usize, std_dev_multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(
            std_dev_multiplier > 0.0,
            "Std dev multiplier must be positive"
        );
        Self {
            period,
            std_dev_multiplier,
        }
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for BollingerBands {
    type Outputs = Option<BollingerOutput>;

    fn calculate(&self, data: &[f64]) -> Vec<Option<BollingerOutput>> {
        let series = dense(data);
        let middle = rolling_mean(&series, self.period);
        let std_dev = rolling_std(&series, self.period);

        data.iter()
            .zip(middle.iter().zip(&std_dev))
            .map(|(&price, (m, s))| {
                let (middle, std_dev) = ((*m)?, (*s)?);
                let upper = middle + self.std_dev_multiplier * std_dev;
                let lower = middle - self.std_dev_multiplier * std_dev;
                Some(BollingerOutput {
                    upper,
                    middle,
                    lower,
                    bandwidth: safe_div(upper - lower, middle),
                    percent_b: safe_div(price - lower, upper - lower),
                })
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }
}
