//! Indicator trait definitions.

use crate::types::PriceBar;

/// Trait for technical indicators over a single input column.
///
/// Outputs are aligned with the input: one entry per data point, `None`
/// while the lookback window is not filled or when the formula has no
/// defined value at that point. Calculations never look ahead.
pub trait Indicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values for the given data.
    ///
    /// # Arguments
    /// * `data` - Input data, oldest first
    ///
    /// # Returns
    /// A vector the same length as `data`
    fn calculate(&self, data: &[f64]) -> Vec<Option<Self::Output>>;

    /// Get the number of data points the lookback needs.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Index of the first point that may carry a value.
    fn warmup(&self) -> usize {
        self.period().saturating_sub(1)
    }
}

/// Multi-output indicator (e.g., Bollinger Bands, MACD).
///
/// Some indicators produce multiple related values.
pub trait MultiOutputIndicator: Send + Sync {
    /// The output type containing multiple values.
    type Outputs;

    /// Calculate indicator values for the given data, aligned with it.
    fn calculate(&self, data: &[f64]) -> Vec<Self::Outputs>;

    /// Get the number of data points the lookback needs.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;
}

/// Indicator that uses whole bars (not just close).
pub trait OhlcvIndicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values from one ticker's chronological bars.
    fn calculate(&self, bars: &[PriceBar]) -> Vec<Option<Self::Output>>;

    /// Get the number of bars the lookback needs.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;
}
