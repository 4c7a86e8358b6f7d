//! SIMD kernels for window reductions.
//!
//! These use the `wide` crate for portable SIMD operations. Every rolling
//! window in the engine is reduced through one of them.

use wide::f64x4;

/// SIMD-optimized sum of a slice.
pub fn sum_simd(data: &[f64]) -> f64 {
    let chunks = data.len() / 4;
    let mut simd_sum = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let values = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        simd_sum += values;
    }

    let mut result = simd_sum.reduce_add();

    // Handle remaining elements
    for &value in &data[(chunks * 4)..] {
        result += value;
    }

    result
}

/// Sum of squared deviations from `mean`.
pub fn sum_sq_dev_simd(data: &[f64], mean: f64) -> f64 {
    let chunks = data.len() / 4;
    let mean_vec = f64x4::splat(mean);
    let mut simd_sum = f64x4::splat(0.0);

    for i in 0..chunks {
        let idx = i * 4;
        let values = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        let diff = values - mean_vec;
        simd_sum += diff * diff;
    }

    let mut result = simd_sum.reduce_add();

    for &value in &data[(chunks * 4)..] {
        let diff = value - mean;
        result += diff * diff;
    }

    result
}

/// Sample standard deviation (n - 1 denominator). `None` below two points.
pub fn sample_std_simd(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let mean = sum_simd(data) / data.len() as f64;
    let variance = sum_sq_dev_simd(data, mean) / (data.len() - 1) as f64;
    Some(variance.sqrt())
}

/// SIMD-optimized min/max finder.
pub fn minmax_simd(data: &[f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }

    let chunks = data.len() / 4;
    let mut min_vec = f64x4::splat(f64::INFINITY);
    let mut max_vec = f64x4::splat(f64::NEG_INFINITY);

    for i in 0..chunks {
        let idx = i * 4;
        let values = f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
        min_vec = min_vec.min(values);
        max_vec = max_vec.max(values);
    }

    let min_arr = min_vec.to_array();
    let max_arr = max_vec.to_array();

    let mut min = min_arr[0].min(min_arr[1]).min(min_arr[2]).min(min_arr[3]);
    let mut max = max_arr[0].max(max_arr[1]).max(max_arr[2]).max(max_arr[3]);

    for &value in &data[(chunks * 4)..] {
        min = min.min(value);
        max = max.max(value);
    }

    Some((min, max))
}
