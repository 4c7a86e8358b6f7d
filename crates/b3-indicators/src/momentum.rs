//! Momentum indicators.

use b3_core::traits::{Indicator, MultiOutputIndicator, OhlcvIndicator};
use b3_core::types::PriceBar;
use serde::{Deserialize, Serialize};

use crate::moving_average::{Ema, Sma};
use crate::rolling::{diff, rolling_max, rolling_mean, rolling_min, safe_div};

/// What RSI reports when a window holds no losses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiZeroLoss {
    /// Report the overbought ceiling, 100.
    #[default]
    Sentinel,
    /// Report no value.
    Null,
}

/// Relative Strength Index (RSI).
///
/// Measures the speed and magnitude of recent price changes
/// to evaluate overbought or oversold conditions. Gains and losses are
/// averaged with a simple rolling mean. The first bar has no move, so the
/// first value appears at index `period`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    zero_loss: RsiZeroLoss,
}

impl Rsi {
    /// Create a new RSI indicator.
    ///
    /// Common periods are 14 (default) or 21.
    pub fn new(period: usize) -> Self {
        Self::with_zero_loss(period, RsiZeroLoss::default())
    }

    pub fn with_zero_loss(period: usize, zero_loss: RsiZeroLoss) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period, zero_loss }
    }

    fn from_averages(&self, avg_gain: f64, avg_loss: f64) -> Option<f64> {
        if avg_loss == 0.0 {
            return match self.zero_loss {
                RsiZeroLoss::Sentinel => Some(100.0),
                RsiZeroLoss::Null => None,
            };
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        let changes = diff(data);
        let gains: Vec<Option<f64>> = changes.iter().map(|c| c.map(|c| c.max(0.0))).collect();
        let losses: Vec<Option<f64>> = changes.iter().map(|c| c.map(|c| (-c).max(0.0))).collect();

        let avg_gains = rolling_mean(&gains, self.period);
        let avg_losses = rolling_mean(&losses, self.period);

        avg_gains
            .into_iter()
            .zip(avg_losses)
            .map(|(gain, loss)| match (gain, loss) {
                (Some(gain), Some(loss)) => self.from_averages(gain, loss),
                _ => None,
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    /// MACD line (fast EMA - slow EMA)
    pub macd: f64,
    /// Signal line (EMA of MACD)
    pub signal: f64,
    /// Histogram (MACD - Signal)
    pub histogram: f64,
}

/// Moving Average Convergence Divergence (MACD).
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    /// Create a new MACD with default parameters (12, 26, 9).
    pub fn new() -> Self {
        Self::with_params(12, 26, 9)
    }

    /// Create a MACD with custom parameters.
    pub fn with_params(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "Fast period must be less than slow period");
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for Macd {
    type Outputs = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        let fast = self.fast.calculate_dense(data);
        let slow = self.slow.calculate_dense(data);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = self.signal.calculate_dense(&macd);

        macd.into_iter()
            .zip(signal)
            .map(|(macd, signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.slow.period()
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

/// Stochastic Oscillator output.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StochasticOutput {
    /// %K line; null when the high/low range is flat
    pub k: Option<f64>,
    /// %D line (SMA of %K)
    pub d: Option<f64>,
}

/// Stochastic Oscillator.
#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Stochastic {
    /// Create a new Stochastic with default parameters (14, 3).
    pub fn new() -> Self {
        Self::with_params(14, 3)
    }

    /// Create a Stochastic with custom parameters.
    pub fn with_params(k_period: usize, d_period: usize) -> Self {
        assert!(k_period > 0, "K period must be greater than 0");
        assert!(d_period > 0, "D period must be greater than 0");
        Self { k_period, d_period }
    }
}

impl Default for Stochastic {
    fn default() -> Self {
        Self::new()
    }
}

/// Rolling highest high and lowest low.
fn channel(bars: &[PriceBar], period: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let highs: Vec<Option<f64>> = bars.iter().map(|b| Some(b.high)).collect();
    let lows: Vec<Option<f64>> = bars.iter().map(|b| Some(b.low)).collect();
    (rolling_max(&highs, period), rolling_min(&lows, period))
}

impl OhlcvIndicator for Stochastic {
    type Output = StochasticOutput;

    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<StochasticOutput>> {
        let (highest, lowest) = channel(bars, self.k_period);

        let k: Vec<Option<f64>> = bars
            .iter()
            .zip(highest.iter().zip(&lowest))
            .map(|(bar, (h, l))| {
                let (h, l) = ((*h)?, (*l)?);
                safe_div(bar.close - l, h - l).map(|r| r * 100.0)
            })
            .collect();
        let d = Sma::new(self.d_period).calculate_nullable(&k);

        k.into_iter()
            .zip(d)
            .map(|(k, d)| Some(StochasticOutput { k, d }))
            .collect()
    }

    fn period(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    fn name(&self) -> &str {
        "Stochastic"
    }
}

/// Williams %R, ranging from -100 to 0.
#[derive(Debug, Clone)]
pub struct WilliamsR {
    period: usize,
}

impl WilliamsR {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl OhlcvIndicator for WilliamsR {
    type Output = f64;

    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let (highest, lowest) = channel(bars, self.period);
        bars.iter()
            .zip(highest.iter().zip(&lowest))
            .map(|(bar, (h, l))| {
                let (h, l) = ((*h)?, (*l)?);
                safe_div(h - bar.close, h - l).map(|r| -100.0 * r)
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "williams_r"
    }
}
