//! Return series.

use b3_core::traits::Indicator;

use crate::rolling::safe_div;

/// Percentage change between consecutive points. The first point is null.
pub fn pct_change(data: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(data.len());
    if !data.is_empty() {
        out.push(None);
    }
    out.extend(data.windows(2).map(|w| safe_div(w[1], w[0]).map(|r| r - 1.0)));
    out
}

/// Natural-log difference between consecutive points.
pub fn log_diff(data: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(data.len());
    if !data.is_empty() {
        out.push(None);
    }
    out.extend(data.windows(2).map(|w| {
        if w[0] > 0.0 && w[1] > 0.0 {
            Some(w[1].ln() - w[0].ln())
        } else {
            None
        }
    }));
    out
}

/// Running sum that skips nulls; null inputs stay null.
pub fn cumulative_sum(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            Some(v.map(|v| {
                *acc += v;
                *acc
            }))
        })
        .collect()
}

/// Simple daily return of close.
#[derive(Debug, Clone, Default)]
pub struct DailyReturn;

impl Indicator for DailyReturn {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        pct_change(data)
    }

    fn period(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "daily_return"
    }
}

/// Log return of close.
#[derive(Debug, Clone, Default)]
pub struct LogReturn;

impl Indicator for LogReturn {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        log_diff(data)
    }

    fn period(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "daily_log_return"
    }
}

/// Running sum of daily returns.
#[derive(Debug, Clone, Default)]
pub struct CumulativeReturn;

impl Indicator for CumulativeReturn {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        cumulative_sum(&pct_change(data))
    }

    fn period(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "cumulative_return"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_return() {
        let result = DailyReturn.calculate(&[10.0, 11.0, 9.9]);

        assert_eq!(result[0], None);
        assert!((result[1].unwrap() - 0.1).abs() < 1e-12);
        assert!((result[2].unwrap() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_log_return() {
        let result = LogReturn.calculate(&[10.0, 20.0]);

        assert_eq!(result[0], None);
        assert!((result[1].unwrap() - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_cumulative_return_skips_nulls() {
        let result = cumulative_sum(&[None, Some(0.1), None, Some(0.2)]);
        assert_eq!(result[0], None);
        assert!((result[1].unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(result[2], None);
        assert!((result[3].unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_single_point() {
        assert_eq!(DailyReturn.calculate(&[10.0]), vec![None]);
        assert!(CumulativeReturn.calculate(&[]).is_empty());
    }
}
