//! Bucket-level opening predictions
//!
//! Combines the aggregated counts, the seasonal decomposition and cascade
//! activity into a probability, an expected duration and a confidence for
//! each bucket. Lookups without history get a low-confidence default.

use crate::aggregation::{AnalyticsBucket, BucketForecast, BucketSet};
use crate::calendar::{SlotCalendar, TimeSlot};
use crate::cascade::CascadeLink;
use crate::config::PredictionConfig;
use bridge_events::{BridgeId, Observation};
use bridge_math::clamp_unit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Horizon a prediction speaks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFrame {
    NextFifteenMinutes,
    NextHour,
    NextDay,
}

/// Which path produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// Aggregated bucket statistics
    Historical,
    /// Trained ARIMA model
    Arima,
    /// Recent opening frequency
    Frequency,
    /// Nothing known about the bridge or slot
    NoData,
}

/// Opening prediction for one bridge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub bridge_id: BridgeId,
    /// Within `[0, 1]`
    pub probability: f64,
    pub expected_duration_minutes: f64,
    /// Within `[0, 1]`
    pub confidence: f64,
    pub reasoning: String,
    pub time_frame: TimeFrame,
    pub source: PredictionSource,
}

impl Prediction {
    /// Default used when there is nothing to base a prediction on
    pub fn no_history(bridge_id: BridgeId, config: &PredictionConfig) -> Self {
        Self {
            bridge_id,
            probability: clamp_unit(config.fallback_probability),
            expected_duration_minutes: config.fallback_duration_minutes,
            confidence: 0.0,
            reasoning: "no historical data".to_string(),
            time_frame: TimeFrame::NextHour,
            source: PredictionSource::NoData,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SlotCascade {
    strength_sum: f64,
    count: u32,
}

/// Scores buckets using dataset-wide context
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    calendar: SlotCalendar,
    config: PredictionConfig,
    /// Local days per `(year, month, day_of_week)` over the dataset span
    census: HashMap<(i32, u32, u32), u32>,
    /// Links arriving at `(target, day_of_week, hour)`
    incoming: HashMap<(BridgeId, u32, u32), SlotCascade>,
}

impl PredictionEngine {
    pub fn new(
        calendar: SlotCalendar,
        config: PredictionConfig,
        observations: &[Observation],
        links: &[CascadeLink],
    ) -> Self {
        let first = observations.iter().map(|obs| obs.open_at).min();
        let last = observations.iter().map(|obs| obs.open_at).max();
        let census = match (first, last) {
            (Some(first), Some(last)) => calendar.day_census(first, last),
            _ => HashMap::new(),
        };

        let mut incoming: HashMap<(BridgeId, u32, u32), SlotCascade> = HashMap::new();
        for link in links {
            let slot = calendar.slot(link.target_at);
            let entry = incoming
                .entry((link.target_bridge_id, slot.day_of_week, slot.hour))
                .or_default();
            entry.strength_sum += link.strength;
            entry.count += 1;
        }

        Self {
            calendar,
            config,
            census,
            incoming,
        }
    }

    /// Number of hour slots matching `slot` in the dataset span, at least one
    pub fn possible_slots(&self, slot: &TimeSlot) -> u32 {
        self.census
            .get(&(slot.year, slot.month, slot.day_of_week))
            .copied()
            .unwrap_or(0)
            .max(1)
    }

    /// Prediction for one decomposed and cascade-profiled bucket
    pub fn predict_bucket(&self, bucket: &AnalyticsBucket) -> Prediction {
        let slot = bucket.slot();
        let decomposition = &bucket.decomposition;
        let count = bucket.opening_count as f64;
        let possible = self.possible_slots(&slot);
        let mut reasons = vec![format!(
            "{} openings in {} matching hours",
            bucket.opening_count, possible
        )];

        let base = count / possible as f64;
        let trend_adjustment = if decomposition.trend > 0.0 { 0.1 } else { -0.1 };
        let seasonal_adjustment = decomposition.seasonal * 0.05;

        let mut pattern_adjustment = 0.0;
        let mut duration_multiplier = 1.0;
        if decomposition.is_weekend {
            pattern_adjustment += 0.15;
            duration_multiplier *= 1.2;
            reasons.push("weekend".to_string());
        }
        if decomposition.is_summer {
            pattern_adjustment += 0.2;
            duration_multiplier *= 1.15;
            reasons.push("summer season".to_string());
        }
        if decomposition.is_rush_hour {
            pattern_adjustment -= 0.1;
            duration_multiplier *= 0.9;
            reasons.push("rush hour".to_string());
        }
        if decomposition.holiday_adjustment > 0.0 {
            reasons.push("holiday period".to_string());
        }

        let cascade_adjustment = match self
            .incoming
            .get(&(bucket.bridge_id(), slot.day_of_week, slot.hour))
        {
            Some(stats) if stats.count > 0 => {
                let average_strength = stats.strength_sum / stats.count as f64;
                let frequency = (stats.count as f64 / count).min(1.0);
                reasons.push(format!("{} cascade arrivals", stats.count));
                average_strength * frequency * 0.2
            }
            _ => 0.0,
        };

        let probability = clamp_unit(
            base + trend_adjustment
                + seasonal_adjustment
                + pattern_adjustment
                + decomposition.holiday_adjustment
                + cascade_adjustment,
        );

        let cascade = &bucket.cascade;
        let cascade_multiplier = if cascade.influence > 0.5 {
            1.1 + 0.2 * cascade.influence
        } else if cascade.susceptibility > 0.5 {
            0.9 + 0.1 * cascade.susceptibility
        } else {
            1.0
        };
        let expected_duration = bucket.average_duration * duration_multiplier * cascade_multiplier;

        let sample_confidence = (count / 10.0).min(1.0);
        let spread = bucket.longest_duration - bucket.shortest_duration;
        let variability_confidence =
            (1.0 - spread / bucket.average_duration.max(1.0) / 10.0).max(0.0);
        let seasonal_confidence = (decomposition.seasonal.abs() / 10.0).min(1.0);
        let cascade_confidence = ((cascade.influence + cascade.susceptibility) / 2.0).min(1.0);
        let confidence = clamp_unit(
            (sample_confidence + variability_confidence + seasonal_confidence + cascade_confidence)
                / 4.0,
        );

        Prediction {
            bridge_id: bucket.bridge_id(),
            probability,
            expected_duration_minutes: expected_duration.max(0.0),
            confidence,
            reasoning: reasons.join("; "),
            time_frame: TimeFrame::NextHour,
            source: PredictionSource::Historical,
        }
    }

    /// Write forecasts back into every bucket
    pub fn enrich(&self, set: &mut BucketSet) {
        for bucket in set.iter_mut() {
            let prediction = self.predict_bucket(bucket);
            bucket.forecast = BucketForecast {
                probability: prediction.probability,
                expected_duration: prediction.expected_duration_minutes,
                confidence: prediction.confidence,
            };
        }
        debug!(buckets = set.len(), "bucket forecasts updated");
    }

    /// Prediction for `bridge_id` in the slot containing `at`
    pub fn predict(&self, set: &BucketSet, bridge_id: BridgeId, at: DateTime<Utc>) -> Prediction {
        let slot = self.calendar.slot(at);
        match set.latest(bridge_id, slot.month, slot.day_of_week, slot.hour) {
            Some(bucket) => self.predict_bucket(bucket),
            None => Prediction::no_history(bridge_id, &self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::TimeBucketAggregator;
    use crate::decomposition::SeasonalDecomposer;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, TimeZone};

    fn weekly_openings() -> Vec<Observation> {
        // Tuesdays in March 2024, 11:00
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 11, 0, 0).unwrap();
        (0..4)
            .map(|week| Observation::closed(1, "Fremont", start + Duration::weeks(week), 10.0))
            .collect()
    }

    #[test]
    fn test_every_matching_day_opened() {
        let observations = weekly_openings();
        let mut set = TimeBucketAggregator::default().aggregate(&observations);
        SeasonalDecomposer::default().decompose(&mut set);

        let engine = PredictionEngine::new(
            SlotCalendar::utc(),
            PredictionConfig::default(),
            &observations,
            &[],
        );
        let bucket = set.iter().next().unwrap();
        assert_eq!(engine.possible_slots(&bucket.slot()), 4);

        // base 1.0 plus a positive trend clamps to one
        let prediction = engine.predict_bucket(bucket);
        assert_eq!(prediction.probability, 1.0);
        assert_abs_diff_eq!(prediction.expected_duration_minutes, 10.0);
        // sample 0.4, variability 1.0, seasonal 0, cascade 0
        assert_abs_diff_eq!(prediction.confidence, 0.35, epsilon = 1e-12);
        assert_eq!(prediction.source, PredictionSource::Historical);
    }

    #[test]
    fn test_unknown_slot_falls_back() {
        let observations = weekly_openings();
        let set = TimeBucketAggregator::default().aggregate(&observations);
        let engine = PredictionEngine::new(
            SlotCalendar::utc(),
            PredictionConfig::default(),
            &observations,
            &[],
        );

        let at = Utc.with_ymd_and_hms(2024, 3, 6, 3, 0, 0).unwrap();
        let prediction = engine.predict(&set, BridgeId(1), at);
        assert_eq!(prediction.probability, 0.1);
        assert_eq!(prediction.expected_duration_minutes, 15.0);
        assert_eq!(prediction.confidence, 0.0);
        assert_eq!(prediction.reasoning, "no historical data");
        assert_eq!(prediction.source, PredictionSource::NoData);
    }

    #[test]
    fn test_enrich_writes_bucket_forecasts() {
        let observations = weekly_openings();
        let mut set = TimeBucketAggregator::default().aggregate(&observations);
        SeasonalDecomposer::default().decompose(&mut set);

        let engine = PredictionEngine::new(
            SlotCalendar::utc(),
            PredictionConfig::default(),
            &observations,
            &[],
        );
        engine.enrich(&mut set);

        let bucket = set.iter().next().unwrap();
        assert_eq!(bucket.forecast.probability, 1.0);
        assert!((0.0..=1.0).contains(&bucket.forecast.confidence));
    }

    #[test]
    fn test_empty_dataset_still_answers() {
        let engine =
            PredictionEngine::new(SlotCalendar::utc(), PredictionConfig::default(), &[], &[]);
        let prediction = engine.predict(&BucketSet::default(), BridgeId(9), Utc::now());
        assert_eq!(prediction.source, PredictionSource::NoData);
        assert!((0.0..=1.0).contains(&prediction.probability));
    }
}
