//! Trailing-window primitives over nullable series.
//!
//! A window yields a value only when it holds `window` non-null points;
//! any null inside the window makes the output null. Output `i` reads
//! inputs `..=i` only.

use crate::simd::{minmax_simd, sample_std_simd, sum_simd};

/// Apply `reduce` to every full trailing window.
pub fn rolling<F>(values: &[Option<f64>], window: usize, reduce: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut buf = Vec::with_capacity(window);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            buf.clear();
            for v in &values[i + 1 - window..=i] {
                buf.push((*v)?);
            }
            reduce(buf.as_slice())
        })
        .collect()
}

pub fn rolling_sum(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| Some(sum_simd(w)))
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| Some(sum_simd(w) / w.len() as f64))
}

/// Rolling sample standard deviation.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std_simd)
}

pub fn rolling_max(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| minmax_simd(w).map(|(_, max)| max))
}

pub fn rolling_min(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| minmax_simd(w).map(|(min, _)| min))
}

/// Lift a dense column into a nullable one.
pub fn dense(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

/// First difference; the first point is null.
pub fn diff(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(None);
    }
    out.extend(values.windows(2).map(|w| Some(w[1] - w[0])));
    out
}

/// Divide, returning `None` for a zero denominator or a non-finite quotient.
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let q = numerator / denominator;
    q.is_finite().then_some(q)
}

/// Element-wise combination of two nullable series.
pub fn zip_with<F>(a: &[Option<f64>], b: &[Option<f64>], f: F) -> Vec<Option<f64>>
where
    F: Fn(f64, f64) -> Option<f64>,
{
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => f(*x, *y),
            _ => None,
        })
        .collect()
}
