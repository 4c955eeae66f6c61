//! Metrics for evaluating forecast performance

use crate::error::{AnalyticsError, Result};
use serde::Serialize;
use std::fmt;

/// Hold-out accuracy of a forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Share of steps where forecast and actual move the same way
    pub direction_agreement: f64,
}

impl ForecastMetrics {
    /// Combined accuracy score, never below 0.5
    pub fn accuracy(&self) -> f64 {
        let fit = 1.0 - self.rmse.min(1.0);
        ((fit + self.direction_agreement) / 2.0).clamp(0.5, 1.0)
    }
}

impl fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE: {:.4}, RMSE: {:.4}, Direction: {:.1}%",
            self.mae,
            self.rmse,
            self.direction_agreement * 100.0
        )
    }
}

/// Evaluate forecast accuracy against actual values.
///
/// Direction agreement only counts steps where both series move; with no
/// such step it is neutral (0.5).
pub fn evaluate_forecast(forecast: &[f64], actual: &[f64]) -> Result<ForecastMetrics> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(AnalyticsError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e.powi(2)).sum::<f64>() / n).sqrt();

    let moves: Vec<bool> = forecast
        .windows(2)
        .zip(actual.windows(2))
        .filter(|(f, a)| (f[1] - f[0]).abs() > 1e-10 && (a[1] - a[0]).abs() > 1e-10)
        .map(|(f, a)| (f[1] > f[0]) == (a[1] > a[0]))
        .collect();

    let direction_agreement = if moves.is_empty() {
        0.5
    } else {
        moves.iter().filter(|&&correct| correct).count() as f64 / moves.len() as f64
    };

    Ok(ForecastMetrics {
        mae,
        rmse,
        direction_agreement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_perfect_forecast() {
        let values = [0.1, 0.3, 0.2, 0.5];
        let metrics = evaluate_forecast(&values, &values).unwrap();
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.direction_agreement, 1.0);
        assert_eq!(metrics.accuracy(), 1.0);
    }

    #[test]
    fn test_accuracy_floor() {
        let metrics = evaluate_forecast(&[0.0, 1.0, 0.0], &[1.0, 0.0, 1.0]).unwrap();
        assert_abs_diff_eq!(metrics.rmse, 1.0);
        assert_eq!(metrics.direction_agreement, 0.0);
        assert_eq!(metrics.accuracy(), 0.5);
    }

    #[test]
    fn test_flat_series_is_direction_neutral() {
        let metrics = evaluate_forecast(&[0.2, 0.2], &[0.4, 0.4]).unwrap();
        assert_eq!(metrics.direction_agreement, 0.5);
        assert_abs_diff_eq!(metrics.mae, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(evaluate_forecast(&[0.1], &[0.1, 0.2]).is_err());
        assert!(evaluate_forecast(&[], &[]).is_err());
    }
}
