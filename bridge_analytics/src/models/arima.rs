//! ARIMA models for opening-intensity forecasting
//!
//! Supports differencing orders 0 and 1. The AR part is trained by one of
//! three [`TrainingMethod`]s of increasing cost; every coefficient is clamped
//! into the method's stability bound.

use super::tier::{ArimaOrder, CapabilityTier};
use crate::error::{AnalyticsError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use bridge_math::clamp_symmetric;
use bridge_math::forecasting::{difference, yule_walker};
use bridge_math::statistics::{autocorrelation, mean};
use serde::{Deserialize, Serialize};
use tracing::debug;

const GRADIENT_ITERATIONS: usize = 50;
const LEARNING_RATE: f64 = 0.01;
const MA_ITERATIONS: usize = 20;

/// How AR (and MA) coefficients are estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMethod {
    /// Scaled lag autocorrelations
    LagCorrelation,
    /// Closed-form Yule-Walker solution
    YuleWalker,
    /// Least squares by gradient descent, with iterative MA re-estimation
    GradientDescent,
}

impl TrainingMethod {
    /// Absolute bound applied to every AR coefficient
    pub fn coefficient_bound(&self) -> f64 {
        match self {
            TrainingMethod::LagCorrelation => 0.5,
            TrainingMethod::YuleWalker => 0.8,
            TrainingMethod::GradientDescent => 0.9,
        }
    }
}

/// Untrained ARIMA(p, d, q) specification
#[derive(Debug, Clone)]
pub struct ArimaEstimator {
    /// Name of the model
    name: String,
    order: ArimaOrder,
    method: TrainingMethod,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArima {
    /// Name of the model
    name: String,
    order: ArimaOrder,
    method: TrainingMethod,
    /// Fitted AR coefficients, most recent lag first
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients, most recent lag first
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series
    intercept: f64,
    /// Training series
    history: Vec<f64>,
    /// In-sample residuals of the differenced series
    residuals: Vec<f64>,
}

impl ArimaEstimator {
    /// Create a new ARIMA model trained with Yule-Walker
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if d > 1 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "Differencing order {} is not supported, use 0 or 1",
                d
            )));
        }

        Ok(Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            order: ArimaOrder { p, d, q },
            method: TrainingMethod::YuleWalker,
        })
    }

    /// Model prescribed by a capability tier
    pub fn for_tier(tier: CapabilityTier) -> Self {
        let profile = tier.profile();
        let ArimaOrder { p, d, q } = profile.order;
        Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            order: profile.order,
            method: profile.training,
        }
    }

    pub fn with_method(mut self, method: TrainingMethod) -> Self {
        self.method = method;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn method(&self) -> TrainingMethod {
        self.method
    }

    /// Shortest series the model can be trained on
    pub fn min_series_length(&self) -> usize {
        self.order.p + self.order.d + self.order.q + 2
    }

    fn fit_ar(&self, centered: &[f64]) -> Vec<f64> {
        let p = self.order.p;
        let bound = self.method.coefficient_bound();

        match self.method {
            TrainingMethod::LagCorrelation => (1..=p)
                .map(|lag| clamp_symmetric(0.3 * autocorrelation(centered, lag), bound))
                .collect(),
            TrainingMethod::YuleWalker => match yule_walker(centered, p) {
                Ok(phi) => phi.into_iter().map(|c| clamp_symmetric(c, bound)).collect(),
                Err(err) => {
                    debug!(error = %err, "Yule-Walker failed, using zero AR coefficients");
                    vec![0.0; p]
                }
            },
            TrainingMethod::GradientDescent => {
                let mut phi = vec![0.0; p];
                let samples = centered.len().saturating_sub(p);
                if samples == 0 {
                    return phi;
                }

                for _ in 0..GRADIENT_ITERATIONS {
                    let mut gradient = vec![0.0; p];
                    for t in p..centered.len() {
                        let error = centered[t] - one_step(&phi, &[], centered, &[], t);
                        for (j, g) in gradient.iter_mut().enumerate() {
                            *g -= 2.0 * error * centered[t - 1 - j];
                        }
                    }
                    for (coefficient, g) in phi.iter_mut().zip(&gradient) {
                        let step = LEARNING_RATE * g / samples as f64;
                        *coefficient = clamp_symmetric(*coefficient - step, bound);
                    }
                }
                phi
            }
        }
    }

    fn fit_ma(&self, centered: &[f64], ar: &[f64]) -> Vec<f64> {
        let q = self.order.q;

        match self.method {
            TrainingMethod::GradientDescent => {
                let bound = self.method.coefficient_bound();
                let mut theta = vec![0.0; q];
                for _ in 0..MA_ITERATIONS {
                    let errors = residuals(ar, &theta, centered);
                    for (k, coefficient) in theta.iter_mut().enumerate() {
                        *coefficient =
                            clamp_symmetric(*coefficient + autocorrelation(&errors, k + 1), bound);
                    }
                }
                theta
            }
            // Fixed weights halving with each lag
            _ => (0..q).map(|k| 0.3 * 0.5_f64.powi(k as i32)).collect(),
        }
    }
}

impl ForecastModel for ArimaEstimator {
    type Trained = TrainedArima;

    fn train(&self, series: &[f64]) -> Result<TrainedArima> {
        if series.len() < self.min_series_length() {
            return Err(AnalyticsError::DataError(format!(
                "Insufficient data for {}. Need at least {} observations, have {}.",
                self.name,
                self.min_series_length(),
                series.len()
            )));
        }
        if series.iter().any(|value| !value.is_finite()) {
            return Err(AnalyticsError::DataError(
                "Series contains non-finite values".to_string(),
            ));
        }

        let differenced = difference(series, self.order.d);
        let intercept = mean(&differenced);
        let centered: Vec<f64> = differenced.iter().map(|value| value - intercept).collect();

        let ar_coefficients = self.fit_ar(&centered);
        let ma_coefficients = self.fit_ma(&centered, &ar_coefficients);
        let residuals = residuals(&ar_coefficients, &ma_coefficients, &centered);

        Ok(TrainedArima {
            name: self.name.clone(),
            order: self.order,
            method: self.method,
            ar_coefficients,
            ma_coefficients,
            intercept,
            history: series.to_vec(),
            residuals,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArima {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn method(&self) -> TrainingMethod {
        self.method
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Number of series points the model was trained on
    pub fn training_sample_size(&self) -> usize {
        self.history.len()
    }

    fn center(&self, series: &[f64]) -> Vec<f64> {
        difference(series, self.order.d)
            .into_iter()
            .map(|value| value - self.intercept)
            .collect()
    }

    /// Undo differencing for one step
    fn integrate(&self, previous_level: f64, centered_step: f64) -> f64 {
        let step = self.intercept + centered_step;
        if self.order.d == 1 {
            previous_level + step
        } else {
            step
        }
    }
}

impl TrainedForecastModel for TrainedArima {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        let Some(&last) = self.history.last() else {
            return Err(AnalyticsError::DataError(
                "Model has not been fitted to data".to_string(),
            ));
        };

        let mut centered = self.center(&self.history);
        let mut errors = self.residuals.clone();
        let mut level = last;
        let mut forecasts = Vec::with_capacity(horizons);

        for _ in 0..horizons {
            let next = one_step(
                &self.ar_coefficients,
                &self.ma_coefficients,
                &centered,
                &errors,
                centered.len(),
            );
            centered.push(next);
            // Future shocks are unknown
            errors.push(0.0);
            level = self.integrate(level, next);
            forecasts.push(level);
        }

        ForecastResult::new(forecasts, horizons)
    }

    fn predict(&self, series: &[f64]) -> Result<ForecastResult> {
        if series.is_empty() {
            return Err(AnalyticsError::DataError("Empty series".to_string()));
        }

        let d = self.order.d;
        let warmup = d + self.order.p;
        let centered = self.center(series);
        let errors = residuals(&self.ar_coefficients, &self.ma_coefficients, &centered);

        let predictions: Vec<f64> = (0..series.len())
            .map(|t| {
                // The first points have no usable lags and echo the actual value
                if t < warmup {
                    return series[t];
                }
                let index = t - d;
                let step = one_step(
                    &self.ar_coefficients,
                    &self.ma_coefficients,
                    &centered,
                    &errors,
                    index,
                );
                let previous = if d == 1 { series[t - 1] } else { 0.0 };
                self.integrate(previous, step)
            })
            .collect();

        let horizons = predictions.len();
        ForecastResult::new(predictions, horizons)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Predicted value at `index` from the AR lags of `centered` and the MA lags of `errors`
fn one_step(ar: &[f64], ma: &[f64], centered: &[f64], errors: &[f64], index: usize) -> f64 {
    let ar_part: f64 = ar
        .iter()
        .enumerate()
        .filter(|(j, _)| index > *j && index - 1 - j < centered.len())
        .map(|(j, phi)| phi * centered[index - 1 - j])
        .sum();
    let ma_part: f64 = ma
        .iter()
        .enumerate()
        .filter(|(k, _)| index > *k && index - 1 - k < errors.len())
        .map(|(k, theta)| theta * errors[index - 1 - k])
        .sum();
    ar_part + ma_part
}

/// One-step residuals; the first `ar.len()` points have none
fn residuals(ar: &[f64], ma: &[f64], centered: &[f64]) -> Vec<f64> {
    let mut errors = vec![0.0; centered.len()];
    for t in ar.len()..centered.len() {
        errors[t] = centered[t] - one_step(ar, ma, centered, &errors, t);
    }
    errors
}
