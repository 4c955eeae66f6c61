//! Autoregressive estimation helpers
//!
//! Contains the pieces an ARIMA fit is assembled from:
//! - Differencing and its inverse
//! - Yule-Walker estimation via the Levinson-Durbin recursion
//! - One-step autoregressive prediction

use crate::statistics::autocorrelations;
use crate::{MathError, Result};

const VARIANCE_EPSILON: f64 = 1e-12;

/// Apply `order` rounds of first differencing
pub fn difference(series: &[f64], order: usize) -> Vec<f64> {
    let mut current = series.to_vec();
    for _ in 0..order {
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    current
}

/// Solve the Yule-Walker equations for `order` AR coefficients.
///
/// `autocorrelations` must contain lags `0..=order`.
pub fn levinson_durbin(autocorrelations: &[f64], order: usize) -> Result<Vec<f64>> {
    if order == 0 {
        return Ok(Vec::new());
    }
    if autocorrelations.len() <= order {
        return Err(MathError::InsufficientData(format!(
            "Need autocorrelations up to lag {}, have {}",
            order,
            autocorrelations.len().saturating_sub(1)
        )));
    }

    let r = autocorrelations;
    let mut phi = vec![0.0; order];
    let mut error = r[0];

    for k in 0..order {
        if error.abs() < VARIANCE_EPSILON {
            return Err(MathError::CalculationError(
                "Prediction error variance collapsed to zero".to_string(),
            ));
        }

        let mut acc = r[k + 1];
        for j in 0..k {
            acc -= phi[j] * r[k - j];
        }
        let reflection = acc / error;

        let previous = phi.clone();
        phi[k] = reflection;
        for j in 0..k {
            phi[j] = previous[j] - reflection * previous[k - 1 - j];
        }

        error *= 1.0 - reflection * reflection;
    }

    Ok(phi)
}

/// Estimate AR coefficients of a (mean-removed) series with Yule-Walker
pub fn yule_walker(series: &[f64], order: usize) -> Result<Vec<f64>> {
    if series.len() <= order + 1 {
        return Err(MathError::InsufficientData(format!(
            "Yule-Walker of order {} needs more than {} points, have {}",
            order,
            order + 1,
            series.len()
        )));
    }

    levinson_durbin(&autocorrelations(series, order), order)
}

/// One-step autoregressive prediction from the tail of `history`.
///
/// `coefficients[0]` multiplies the most recent value. Missing history is
/// treated as zero.
pub fn ar_predict(history: &[f64], coefficients: &[f64]) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .map(|(lag, coefficient)| {
            history
                .len()
                .checked_sub(lag + 1)
                .map(|idx| coefficient * history[idx])
                .unwrap_or(0.0)
        })
        .sum()
}
