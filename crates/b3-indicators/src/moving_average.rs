//! Moving average indicators.

use b3_core::traits::Indicator;

use crate::rolling::{dense, rolling_mean, safe_div, zip_with};

/// Simple Moving Average (SMA).
///
/// Calculates the arithmetic mean of the last N values. Null until N
/// values have accumulated.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// SMA over a nullable series (e.g. another indicator's output).
    pub fn calculate_nullable(&self, data: &[Option<f64>]) -> Vec<Option<f64>> {
        rolling_mean(data, self.period)
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        rolling_mean(&dense(data), self.period)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential Moving Average (EMA).
///
/// Adjusted exponentially weighted mean with `alpha = 2 / (span + 1)`:
/// each output is the weighted average of every point so far, weights
/// decaying by `1 - alpha` per step. Defined from the first point.
#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    multiplier: f64,
}

impl Ema {
    /// Create a new EMA with the specified span.
    pub fn new(span: usize) -> Self {
        assert!(span > 0, "Period must be greater than 0");
        let multiplier = 2.0 / (span as f64 + 1.0);
        Self { span, multiplier }
    }

    /// Dense output; every point has a value.
    pub fn calculate_dense(&self, data: &[f64]) -> Vec<f64> {
        let decay = 1.0 - self.multiplier;
        let mut weighted = 0.0;
        let mut weights = 0.0;

        data.iter()
            .map(|&price| {
                weighted = price + decay * weighted;
                weights = 1.0 + decay * weights;
                weighted / weights
            })
            .collect()
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        self.calculate_dense(data).into_iter().map(Some).collect()
    }

    fn period(&self) -> usize {
        self.span
    }

    fn name(&self) -> &str {
        "EMA"
    }

    fn warmup(&self) -> usize {
        0
    }
}

/// Distance of close from its SMA, in percent of the SMA.
#[derive(Debug, Clone)]
pub struct PriceVsSma {
    sma: Sma,
}

impl PriceVsSma {
    pub fn new(period: usize) -> Self {
        Self {
            sma: Sma::new(period),
        }
    }

    /// Combine closes with an SMA already computed for the same period.
    pub fn from_sma(close: &[f64], sma: &[Option<f64>]) -> Vec<Option<f64>> {
        zip_with(&dense(close), sma, |c, s| safe_div(c - s, s).map(|r| r * 100.0))
    }
}

impl Indicator for PriceVsSma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        Self::from_sma(data, &self.sma.calculate(data))
    }

    fn period(&self) -> usize {
        self.sma.period()
    }

    fn name(&self) -> &str {
        "price_vs_sma_pct"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let sma = Sma::new(3);
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma.calculate(&data);

        assert_eq!(result.len(), 5);
        assert!(result[..2].iter().all(Option::is_none));
        assert!((result[2].unwrap() - 2.0).abs() < 1e-10); // (1+2+3)/3
        assert!((result[4].unwrap() - 4.0).abs() < 1e-10); // (3+4+5)/3
    }

    #[test]
    fn test_sma_insufficient_data() {
        let sma = Sma::new(5);
        let data = vec![1.0, 2.0, 3.0];
        let result = sma.calculate(&data);

        assert_eq!(result.len(), 3);
        assert!(result.iter().all(Option::is_none));
    }

    #[test]
    fn test_ema_adjusted_weights() {
        let ema = Ema::new(3);
        let data = vec![1.0, 2.0, 3.0];
        let result = ema.calculate_dense(&data);

        // alpha = 0.5: weights 1, 0.5, 0.25 on newest to oldest
        assert!((result[0] - 1.0).abs() < 1e-12);
        assert!((result[1] - (2.0 + 0.5) / 1.5).abs() < 1e-12);
        assert!((result[2] - (3.0 + 1.0 + 0.25) / 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_ema_defined_from_first_point() {
        let ema = Ema::new(200);
        let result = ema.calculate(&[10.0, 10.0]);

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|v| (v.unwrap() - 10.0).abs() < 1e-12));
        assert_eq!(ema.warmup(), 0);
    }

    #[test]
    fn test_price_vs_sma() {
        let indicator = PriceVsSma::new(2);
        let result = indicator.calculate(&[10.0, 10.0, 13.0]);

        assert_eq!(result[0], None);
        assert!((result[1].unwrap()).abs() < 1e-12);
        // sma = 11.5, (13 - 11.5) / 11.5 * 100
        assert!((result[2].unwrap() - 1.5 / 11.5 * 100.0).abs() < 1e-10);
    }
}
