//! Descriptive statistics with neutral defaults
//!
//! Every function here returns a finite value for empty or degenerate input
//! instead of propagating NaN, so callers can feed raw bucket data directly.

use num_traits::Float;
use statrs::statistics::Statistics;

/// Arithmetic mean, `0.0` for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Population standard deviation, `0.0` for fewer than two values
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let std_dev = values.iter().population_std_dev();
    if std_dev.is_finite() {
        std_dev
    } else {
        0.0
    }
}

/// Coefficient of variation (population std dev over mean).
///
/// Returns `None` when the mean is zero or there is nothing to measure.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let mean = mean(values);
    if values.is_empty() || mean.abs() < 1e-12 {
        return None;
    }
    Some(population_std_dev(values) / mean.abs())
}

/// Sample autocorrelation of `series` at `lag`.
///
/// Uses the biased estimator (full-series variance in the denominator), which
/// keeps the resulting Toeplitz system positive definite.
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    let n = series.len();
    if lag >= n {
        return 0.0;
    }

    let mean = mean(series);
    let denominator: f64 = series.iter().map(|x| (x - mean).powi(2)).sum();
    if denominator < 1e-12 {
        return 0.0;
    }

    let numerator: f64 = (lag..n)
        .map(|t| (series[t] - mean) * (series[t - lag] - mean))
        .sum();

    numerator / denominator
}

/// Autocorrelations for lags `0..=max_lag`
pub fn autocorrelations(series: &[f64], max_lag: usize) -> Vec<f64> {
    (0..=max_lag)
        .map(|lag| {
            if lag == 0 {
                1.0
            } else {
                autocorrelation(series, lag)
            }
        })
        .collect()
}

/// Clamp into `[0, 1]`, mapping NaN to zero
pub fn clamp_unit<T: Float>(value: T) -> T {
    if value.is_nan() {
        return T::zero();
    }
    value.max(T::zero()).min(T::one())
}

/// Clamp into `[-bound, bound]`, mapping NaN to zero
pub fn clamp_symmetric<T: Float>(value: T, bound: T) -> T {
    if value.is_nan() {
        return T::zero();
    }
    let bound = bound.abs();
    value.max(-bound).min(bound)
}
