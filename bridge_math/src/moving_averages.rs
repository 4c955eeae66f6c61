//! Moving average calculation implementations
//!
//! Contains the smoothing used for trend extraction:
//! - Centered Moving Average with boundary clamping

use crate::{MathError, Result};

/// Centered moving average over `window` samples.
///
/// Each output point averages the samples in `[i - window/2, i + window - window/2)`.
/// Near the ends the window is clamped to the available samples instead of
/// being padded, so the output has the same length as the input.
pub fn centered_moving_average(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(MathError::InvalidInput(
            "Window must be greater than zero".to_string(),
        ));
    }

    let n = values.len();
    let half = window / 2;

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for value in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + value);
    }

    let averages = (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + window - half).min(n);
            (prefix[end] - prefix[start]) / (end - start) as f64
        })
        .collect();

    Ok(averages)
}
