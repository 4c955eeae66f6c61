//! Seasonal decomposition of bucket opening counts
//!
//! Works bridge by bridge on buckets in `(year, month, day_of_week, hour)`
//! order. The seasonal component is additive: weekly, monthly and hourly
//! deviations from the bridge's global mean count.

use crate::aggregation::{BucketSet, Decomposition};
use bridge_events::BridgeId;
use bridge_math::centered_moving_average;
use bridge_math::statistics::mean;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Splits opening counts into trend, seasonal and residual parts
#[derive(Debug, Clone)]
pub struct SeasonalDecomposer {
    trend_window: usize,
}

impl Default for SeasonalDecomposer {
    fn default() -> Self {
        Self { trend_window: 24 }
    }
}

impl SeasonalDecomposer {
    pub fn new(trend_window: usize) -> Self {
        Self {
            trend_window: trend_window.max(1),
        }
    }

    /// Fill in the decomposition fields of every bucket in `set`
    pub fn decompose(&self, set: &mut BucketSet) {
        for bridge_id in set.bridge_ids() {
            self.decompose_bridge(set, bridge_id);
        }
        debug!(buckets = set.len(), "decomposed bucket opening counts");
    }

    fn decompose_bridge(&self, set: &mut BucketSet, bridge_id: BridgeId) {
        let (slots, counts): (Vec<_>, Vec<f64>) = set
            .for_bridge(bridge_id)
            .map(|bucket| (bucket.slot(), bucket.opening_count as f64))
            .unzip();
        if counts.is_empty() {
            return;
        }

        let trend = match centered_moving_average(&counts, self.trend_window) {
            Ok(trend) => trend,
            Err(err) => {
                warn!(
                    bridge = %bridge_id,
                    error = %err,
                    "trend extraction failed, using flat trend"
                );
                vec![mean(&counts); counts.len()]
            }
        };

        let global_mean = mean(&counts);
        let weekly = group_means(slots.iter().map(|slot| slot.day_of_week).zip(&counts));
        let monthly = group_means(slots.iter().map(|slot| slot.month).zip(&counts));
        let hourly = group_means(slots.iter().map(|slot| slot.hour).zip(&counts));

        let deviation = |means: &HashMap<u32, f64>, key: u32| {
            means.get(&key).copied().unwrap_or(global_mean) - global_mean
        };

        for (index, bucket) in set.for_bridge_mut(bridge_id).enumerate() {
            let slot = bucket.slot();
            let weekly_seasonality = deviation(&weekly, slot.day_of_week);
            let monthly_seasonality = deviation(&monthly, slot.month);
            let hourly_seasonality = deviation(&hourly, slot.hour);
            let seasonal = weekly_seasonality + monthly_seasonality + hourly_seasonality;

            bucket.decomposition = Decomposition {
                trend: trend[index],
                seasonal,
                residual: counts[index] - trend[index] - seasonal,
                weekly_seasonality,
                monthly_seasonality,
                hourly_seasonality,
                is_weekend: slot.is_weekend(),
                is_rush_hour: slot.is_rush_hour(),
                is_summer: slot.is_summer(),
                holiday_adjustment: slot.holiday_adjustment(),
            };
        }
    }
}

/// Mean count per group key
fn group_means<'a>(pairs: impl Iterator<Item = (u32, &'a f64)>) -> HashMap<u32, f64> {
    let mut sums: HashMap<u32, (f64, usize)> = HashMap::new();
    for (key, value) in pairs {
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::TimeBucketAggregator;
    use approx::assert_abs_diff_eq;
    use bridge_events::Observation;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_uniform_counts_have_no_seasonality() {
        // One opening per day at 09:00 for two weeks, so every weekday bucket holds two
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let observations: Vec<_> = (0..14)
            .map(|day| Observation::closed(1, "Fremont", start + Duration::days(day), 10.0))
            .collect();

        let mut set = TimeBucketAggregator::default().aggregate(&observations);
        SeasonalDecomposer::default().decompose(&mut set);

        for bucket in set.iter() {
            let d = &bucket.decomposition;
            assert_abs_diff_eq!(d.trend, 2.0);
            assert_abs_diff_eq!(d.seasonal, 0.0);
            assert_abs_diff_eq!(d.residual, 0.0);
        }
    }

    #[test]
    fn test_components_sum_to_count() {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
        let mut observations = Vec::new();
        for day in 0..10 {
            let at = start + Duration::days(day);
            observations.push(Observation::closed(1, "Fremont", at, 10.0));
            if day % 3 == 0 {
                let early = at + Duration::minutes(30);
                observations.push(Observation::closed(1, "Fremont", early, 5.0));
                observations.push(Observation::closed(1, "Fremont", at + Duration::hours(9), 5.0));
            }
        }

        let mut set = TimeBucketAggregator::default().aggregate(&observations);
        SeasonalDecomposer::new(4).decompose(&mut set);

        for bucket in set.iter() {
            let d = &bucket.decomposition;
            assert_abs_diff_eq!(
                d.trend + d.seasonal + d.residual,
                bucket.opening_count as f64,
                epsilon = 1e-9
            );
            assert_abs_diff_eq!(
                d.seasonal,
                d.weekly_seasonality + d.monthly_seasonality + d.hourly_seasonality,
                epsilon = 1e-12
            );
            // July is treated as a holiday month
            assert_eq!(d.holiday_adjustment, 0.3);
            assert!(d.is_summer);
        }
    }
}
