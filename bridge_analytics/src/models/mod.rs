//! Forecasting models for opening-intensity series

use crate::error::{AnalyticsError, Result};
use std::fmt::Debug;

pub mod arima;
pub mod tier;

pub use arima::{ArimaEstimator, TrainedArima, TrainingMethod};
pub use tier::{ArimaOrder, CapabilityDescriptor, CapabilityTier, ThroughputClass, TierProfile};

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Forecasted values
    values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(AnalyticsError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self { values, horizons })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// The `count` trailing values
    pub fn tail(&self, count: usize) -> &[f64] {
        &self.values[self.values.len().saturating_sub(count)..]
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for future periods
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// One-step-ahead predictions for every point of `series`
    fn predict(&self, series: &[f64]) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a series
    fn train(&self, series: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_result_length_check() {
        assert!(ForecastResult::new(vec![0.1, 0.2], 3).is_err());

        let result = ForecastResult::new(vec![0.1, 0.2, 0.3], 3).unwrap();
        assert_eq!(result.horizons(), 3);
        assert_eq!(result.tail(2), &[0.2, 0.3]);
        assert_eq!(result.tail(10).len(), 3);
    }
}
