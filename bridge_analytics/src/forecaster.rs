//! Per-bridge ARIMA forecasting
//!
//! The bridge's openings are turned into a windowed intensity series, an
//! ARIMA model of the tier's order is trained on it and evaluated on a
//! hold-out, and the one-step forecast is adjusted for time of day, weekday
//! and seasonality. With too little data the forecaster answers from recent
//! opening frequency instead.

use crate::aggregation::BucketSet;
use crate::calendar::SlotCalendar;
use crate::error::Result;
use crate::metrics::evaluate_forecast;
use crate::models::{
    ArimaEstimator, CapabilityDescriptor, CapabilityTier, ForecastModel, TierProfile,
    TrainedArima, TrainedForecastModel,
};
use crate::prediction::{Prediction, PredictionSource, TimeFrame};
use crate::utils::{holdout_split, hours_between};
use bridge_events::{BridgeId, Observation};
use bridge_math::clamp_unit;
use bridge_math::statistics::mean;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use tracing::{debug, warn};

const DEFAULT_DURATION_MINUTES: f64 = 15.0;
const RECENT_OBSERVATIONS: usize = 10;

/// Snapshot of a trained model, rebuilt on every request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArimaModel {
    pub bridge_id: BridgeId,
    pub tier: CapabilityTier,
    pub ar_coefficients: Vec<f64>,
    pub ma_coefficients: Vec<f64>,
    pub intercept: f64,
    pub training_sample_size: usize,
    /// Hold-out accuracy, at least 0.5
    pub accuracy: f64,
    pub rmse: f64,
    pub trained_at: DateTime<Utc>,
}

/// Outcome of one forecast request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArimaForecast {
    pub prediction: Prediction,
    /// `None` when the frequency fallback answered
    pub model: Option<ArimaModel>,
}

/// ARIMA forecaster sized by a capability tier
#[derive(Debug, Clone)]
pub struct ArimaForecaster {
    tier: CapabilityTier,
    profile: TierProfile,
    calendar: SlotCalendar,
}

impl ArimaForecaster {
    pub fn new(capability: CapabilityDescriptor, calendar: SlotCalendar) -> Self {
        Self::with_tier(capability.tier(), calendar)
    }

    pub fn with_tier(tier: CapabilityTier, calendar: SlotCalendar) -> Self {
        Self {
            tier,
            profile: tier.profile(),
            calendar,
        }
    }

    pub fn tier(&self) -> CapabilityTier {
        self.tier
    }

    pub fn profile(&self) -> &TierProfile {
        &self.profile
    }

    /// Windowed intensity series of one bridge's openings.
    ///
    /// Windows run from the first to the last opening; only the most recent
    /// `max_series_length` are kept. Each point blends the window's opening
    /// count and total open minutes, both normalized by their maximum.
    pub fn build_series(&self, observations: &[&Observation]) -> Vec<f64> {
        let (Some(first), Some(last)) = (
            observations.iter().map(|obs| obs.open_at).min(),
            observations.iter().map(|obs| obs.open_at).max(),
        ) else {
            return Vec::new();
        };

        let width_ms = self.profile.window_minutes * 60_000;
        let window_of = |at: DateTime<Utc>| (at - first).num_milliseconds() / width_ms;
        // Only the most recent windows are allocated
        let total_windows = window_of(last) + 1;
        let keep_from = (total_windows - self.profile.max_series_length as i64).max(0);
        let windows = (total_windows - keep_from) as usize;

        let mut counts = vec![0.0; windows];
        let mut durations = vec![0.0; windows];
        for obs in observations {
            let index = window_of(obs.open_at) - keep_from;
            if index < 0 {
                continue;
            }
            counts[index as usize] += 1.0;
            durations[index as usize] += obs.duration_minutes.max(0.0);
        }

        let max_count = counts.iter().cloned().fold(0.0, f64::max);
        let max_duration = durations.iter().cloned().fold(0.0, f64::max);
        let normalize = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };

        counts
            .iter()
            .zip(&durations)
            .map(|(count, duration)| {
                clamp_unit(
                    0.5 * normalize(*count, max_count) + 0.5 * normalize(*duration, max_duration),
                )
            })
            .collect()
    }

    /// Forecast the opening probability of `bridge_id` at `now`.
    ///
    /// Never fails: too little data or a failed fit answers from opening
    /// frequency instead.
    pub fn forecast(
        &self,
        bridge_id: BridgeId,
        observations: &[Observation],
        buckets: Option<&BucketSet>,
        now: DateTime<Utc>,
    ) -> ArimaForecast {
        let mut history: Vec<&Observation> = observations
            .iter()
            .filter(|obs| obs.bridge_id == bridge_id && obs.open_at <= now)
            .collect();
        history.sort_by(|a, b| a.open_at.cmp(&b.open_at));

        let series = self.build_series(&history);
        let minimum = self.profile.min_training_samples;
        if history.len() < minimum || series.len() < minimum {
            debug!(
                bridge = %bridge_id,
                observations = history.len(),
                series = series.len(),
                minimum,
                "not enough samples for ARIMA, using frequency fallback"
            );
            return self.frequency_fallback(bridge_id, &history, now);
        }

        match self.fit(&series) {
            Ok((model, accuracy, rmse)) => {
                let prediction = self.adjusted_prediction(
                    bridge_id,
                    &model,
                    &series,
                    &history,
                    buckets,
                    now,
                    accuracy,
                );
                ArimaForecast {
                    prediction,
                    model: Some(ArimaModel {
                        bridge_id,
                        tier: self.tier,
                        ar_coefficients: model.ar_coefficients().to_vec(),
                        ma_coefficients: model.ma_coefficients().to_vec(),
                        intercept: model.intercept(),
                        training_sample_size: model.training_sample_size(),
                        accuracy,
                        rmse,
                        trained_at: now,
                    }),
                }
            }
            Err(err) => {
                warn!(
                    bridge = %bridge_id,
                    error = %err,
                    "ARIMA fit failed, using frequency fallback"
                );
                self.frequency_fallback(bridge_id, &history, now)
            }
        }
    }

    /// Train on the series head, score on the hold-out, then refit on everything
    fn fit(&self, series: &[f64]) -> Result<(TrainedArima, f64, f64)> {
        let estimator = ArimaEstimator::for_tier(self.tier);
        let (training, holdout) = holdout_split(series);

        let evaluated = estimator.train(training)?;
        let predictions = evaluated.predict(series)?;
        let metrics = evaluate_forecast(predictions.tail(holdout.len()), holdout)?;
        debug!(metrics = %metrics, "ARIMA hold-out evaluation");

        let model = estimator.train(series)?;
        Ok((model, metrics.accuracy(), metrics.rmse))
    }

    #[allow(clippy::too_many_arguments)]
    fn adjusted_prediction(
        &self,
        bridge_id: BridgeId,
        model: &TrainedArima,
        series: &[f64],
        history: &[&Observation],
        buckets: Option<&BucketSet>,
        now: DateTime<Utc>,
        accuracy: f64,
    ) -> Prediction {
        let raw = model
            .forecast(1)
            .ok()
            .and_then(|forecast| forecast.values().first().copied())
            .unwrap_or(0.0);

        let slot = self.calendar.slot(now);
        let local_hour = now.with_timezone(&self.calendar.offset()).hour();
        let hour_factor = hour_of_day_factor(local_hour);
        let weekday_factor = if slot.is_weekend() { 1.3 } else { 0.9 };

        let seasonal_nudge = buckets
            .and_then(|set| set.latest(bridge_id, slot.month, slot.day_of_week, slot.hour))
            .map(|bucket| bucket.decomposition.seasonal * 0.05)
            .unwrap_or(0.0);

        let recent = &series[series.len().saturating_sub(3)..];
        let momentum = if mean(recent) > 0.5 { 0.1 } else { 0.0 };

        let probability =
            clamp_unit(raw * hour_factor * weekday_factor + seasonal_nudge + momentum);

        Prediction {
            bridge_id,
            probability,
            expected_duration_minutes: recent_mean_duration(history),
            confidence: clamp_unit(accuracy),
            reasoning: format!(
                "{} forecast {:.2} adjusted by hour factor {:.1} and weekday factor {:.1}",
                model.name(),
                raw,
                hour_factor,
                weekday_factor
            ),
            time_frame: TimeFrame::NextHour,
            source: PredictionSource::Arima,
        }
    }

    /// Probability from the rate of the last few openings
    fn frequency_fallback(
        &self,
        bridge_id: BridgeId,
        history: &[&Observation],
        now: DateTime<Utc>,
    ) -> ArimaForecast {
        let recent = &history[history.len().saturating_sub(RECENT_OBSERVATIONS)..];
        let prediction = match recent.first() {
            None => Prediction {
                bridge_id,
                probability: 0.1,
                expected_duration_minutes: DEFAULT_DURATION_MINUTES,
                confidence: 0.0,
                reasoning: "no historical data".to_string(),
                time_frame: TimeFrame::NextHour,
                source: PredictionSource::NoData,
            },
            Some(oldest) => {
                let span_hours = hours_between(oldest.open_at, now).max(1.0);
                let rate = recent.len() as f64 / span_hours;
                Prediction {
                    bridge_id,
                    probability: clamp_unit(1.0 - (-rate).exp()),
                    expected_duration_minutes: recent_mean_duration(recent),
                    confidence: 0.3,
                    reasoning: format!(
                        "{} openings in the last {:.1} hours",
                        recent.len(),
                        span_hours
                    ),
                    time_frame: TimeFrame::NextHour,
                    source: PredictionSource::Frequency,
                }
            }
        };

        ArimaForecast {
            prediction,
            model: None,
        }
    }
}

/// Traffic-pattern factor for the local hour
fn hour_of_day_factor(hour: u32) -> f64 {
    match hour {
        7..=9 => 0.8,
        10..=15 => 1.2,
        16..=18 => 0.9,
        19..=22 => 1.1,
        _ => 0.6,
    }
}

/// Mean of the last ten positive durations, or the default
fn recent_mean_duration(history: &[&Observation]) -> f64 {
    let durations: Vec<f64> = history
        .iter()
        .rev()
        .map(|obs| obs.duration_minutes)
        .filter(|duration| *duration > 0.0)
        .take(RECENT_OBSERVATIONS)
        .collect();

    if durations.is_empty() {
        DEFAULT_DURATION_MINUTES
    } else {
        mean(&durations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThroughputClass;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_hour_factors() {
        assert_eq!(hour_of_day_factor(8), 0.8);
        assert_eq!(hour_of_day_factor(12), 1.2);
        assert_eq!(hour_of_day_factor(17), 0.9);
        assert_eq!(hour_of_day_factor(20), 1.1);
        assert_eq!(hour_of_day_factor(2), 0.6);
    }

    #[test]
    fn test_series_blends_count_and_duration() {
        let forecaster = ArimaForecaster::with_tier(CapabilityTier::Basic, SlotCalendar::utc());
        let observations = vec![
            Observation::closed(1, "Fremont", start(), 10.0),
            Observation::closed(1, "Fremont", start() + Duration::minutes(20), 10.0),
            Observation::closed(1, "Fremont", start() + Duration::hours(2), 5.0),
        ];
        let refs: Vec<&Observation> = observations.iter().collect();

        let series = forecaster.build_series(&refs);
        assert_eq!(series.len(), 3);
        assert_abs_diff_eq!(series[0], 1.0);
        assert_abs_diff_eq!(series[1], 0.0);
        assert_abs_diff_eq!(series[2], 0.5 * 0.5 + 0.5 * 0.25);
    }

    #[test]
    fn test_series_is_truncated_to_tier_length() {
        let forecaster = ArimaForecaster::with_tier(CapabilityTier::Basic, SlotCalendar::utc());
        let observations: Vec<_> = (0..100)
            .map(|i| Observation::closed(1, "Fremont", start() + Duration::hours(i), 5.0))
            .collect();
        let refs: Vec<&Observation> = observations.iter().collect();
        assert_eq!(forecaster.build_series(&refs).len(), 24);
    }

    #[test]
    fn test_distant_history_outside_kept_windows() {
        let forecaster = ArimaForecaster::with_tier(CapabilityTier::Basic, SlotCalendar::utc());
        let observations = vec![
            Observation::closed(1, "Fremont", start() - Duration::days(365 * 50), 30.0),
            Observation::closed(1, "Fremont", start() - Duration::hours(5), 10.0),
            Observation::closed(1, "Fremont", start(), 10.0),
        ];
        let refs: Vec<&Observation> = observations.iter().collect();

        let series = forecaster.build_series(&refs);
        assert_eq!(series.len(), 24);
        assert_abs_diff_eq!(series[23], 1.0);
        assert_abs_diff_eq!(series[18], 1.0);
        assert_eq!(series.iter().filter(|value| **value > 0.0).count(), 2);
    }

    #[test]
    fn test_fallback_without_history() {
        let forecaster = ArimaForecaster::new(
            CapabilityDescriptor::new(2, ThroughputClass::Standard),
            SlotCalendar::utc(),
        );
        let forecast = forecaster.forecast(BridgeId(1), &[], None, start());
        assert!(forecast.model.is_none());
        assert_eq!(forecast.prediction.probability, 0.1);
        assert_eq!(forecast.prediction.expected_duration_minutes, 15.0);
        assert_eq!(forecast.prediction.confidence, 0.0);
    }
}
