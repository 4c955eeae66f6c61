//! Time bucket aggregation
//!
//! Groups raw observations into one [`AnalyticsBucket`] per
//! `(bridge, year, month, day_of_week, hour)`. The bucket also carries the
//! decomposition, cascade and forecast fields later stages fill in.

use crate::calendar::{SlotCalendar, TimeSlot};
use bridge_events::{BridgeId, Observation};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

/// Composite key of a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub bridge_id: BridgeId,
    pub slot: TimeSlot,
}

/// Trend/seasonal/residual split of a bucket's opening count
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Decomposition {
    pub trend: f64,
    /// Sum of the weekly, monthly and hourly components
    pub seasonal: f64,
    pub residual: f64,
    pub weekly_seasonality: f64,
    pub monthly_seasonality: f64,
    pub hourly_seasonality: f64,
    pub is_weekend: bool,
    pub is_rush_hour: bool,
    pub is_summer: bool,
    pub holiday_adjustment: f64,
}

/// Cascade statistics of a bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeProfile {
    /// How strongly openings in this slot set off other bridges
    pub influence: f64,
    /// How strongly openings in this slot follow other bridges
    pub susceptibility: f64,
    pub primary_cascade_target: Option<BridgeId>,
    /// Mean delay to the primary target, in minutes
    pub cascade_delay: f64,
    pub cascade_probability: f64,
}

/// Forecast written back into a bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketForecast {
    pub probability: f64,
    pub expected_duration: f64,
    pub confidence: f64,
}

/// Aggregated statistics for one bridge in one calendar slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsBucket {
    pub key: BucketKey,
    pub bridge_name: String,
    /// Always at least one
    pub opening_count: u32,
    pub total_minutes_open: f64,
    pub average_duration: f64,
    pub longest_duration: f64,
    pub shortest_duration: f64,
    pub decomposition: Decomposition,
    pub cascade: CascadeProfile,
    pub forecast: BucketForecast,
}

impl AnalyticsBucket {
    pub fn bridge_id(&self) -> BridgeId {
        self.key.bridge_id
    }

    pub fn slot(&self) -> TimeSlot {
        self.key.slot
    }
}

/// Running totals for one key.
///
/// Durations are kept as whole milliseconds so the sums are exact and the
/// result does not depend on the order observations arrive in.
#[derive(Debug, Clone)]
struct BucketAccumulator {
    bridge_name: String,
    count: u32,
    /// Wide enough that no run of `i64` durations can overflow it
    total_millis: i128,
    longest_millis: i64,
    shortest_millis: i64,
}

impl BucketAccumulator {
    fn new(obs: &Observation, millis: i64) -> Self {
        Self {
            bridge_name: obs.bridge_name.clone(),
            count: 1,
            total_millis: i128::from(millis),
            longest_millis: millis,
            shortest_millis: millis,
        }
    }

    fn add(&mut self, obs: &Observation, millis: i64) {
        self.count += 1;
        self.total_millis += i128::from(millis);
        self.longest_millis = self.longest_millis.max(millis);
        self.shortest_millis = self.shortest_millis.min(millis);
        if obs.bridge_name < self.bridge_name {
            self.bridge_name = obs.bridge_name.clone();
        }
    }

    fn finish(self, key: BucketKey) -> AnalyticsBucket {
        let to_minutes = |millis: i64| millis as f64 / 60_000.0;
        let longest = to_minutes(self.longest_millis);
        let shortest = to_minutes(self.shortest_millis);
        let total = self.total_millis as f64 / 60_000.0;
        // Rounding guard: the mean of integers always lies within their range
        let average = (total / self.count as f64).clamp(shortest, longest);

        AnalyticsBucket {
            key,
            bridge_name: self.bridge_name,
            opening_count: self.count,
            total_minutes_open: total,
            average_duration: average,
            longest_duration: longest,
            shortest_duration: shortest,
            decomposition: Decomposition::default(),
            cascade: CascadeProfile::default(),
            forecast: BucketForecast::default(),
        }
    }
}

/// Buckets of one aggregation pass, ordered by bridge then slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSet {
    buckets: BTreeMap<BucketKey, AnalyticsBucket>,
}

impl Serialize for BucketSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.buckets.values())
    }
}

impl BucketSet {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, key: &BucketKey) -> Option<&AnalyticsBucket> {
        self.buckets.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalyticsBucket> {
        self.buckets.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AnalyticsBucket> {
        self.buckets.values_mut()
    }

    /// Distinct bridges, ascending
    pub fn bridge_ids(&self) -> Vec<BridgeId> {
        let mut ids: Vec<BridgeId> = self.buckets.keys().map(|key| key.bridge_id).collect();
        ids.dedup();
        ids
    }

    /// Buckets of one bridge in slot order
    pub fn for_bridge(&self, bridge_id: BridgeId) -> impl Iterator<Item = &AnalyticsBucket> {
        self.buckets
            .values()
            .filter(move |bucket| bucket.key.bridge_id == bridge_id)
    }

    pub fn for_bridge_mut(
        &mut self,
        bridge_id: BridgeId,
    ) -> impl Iterator<Item = &mut AnalyticsBucket> {
        self.buckets
            .values_mut()
            .filter(move |bucket| bucket.key.bridge_id == bridge_id)
    }

    /// Buckets matching `(bridge, month, day_of_week, hour)` across all years
    pub fn query(
        &self,
        bridge_id: BridgeId,
        month: u32,
        day_of_week: u32,
        hour: u32,
    ) -> Vec<&AnalyticsBucket> {
        self.for_bridge(bridge_id)
            .filter(|bucket| {
                let slot = bucket.key.slot;
                slot.month == month && slot.day_of_week == day_of_week && slot.hour == hour
            })
            .collect()
    }

    /// Most recent year's bucket for `(bridge, month, day_of_week, hour)`
    pub fn latest(
        &self,
        bridge_id: BridgeId,
        month: u32,
        day_of_week: u32,
        hour: u32,
    ) -> Option<&AnalyticsBucket> {
        self.query(bridge_id, month, day_of_week, hour)
            .into_iter()
            .max_by_key(|bucket| bucket.key.slot.year)
    }
}

/// Groups observations into per-bridge time buckets
#[derive(Debug, Clone, Default)]
pub struct TimeBucketAggregator {
    calendar: SlotCalendar,
}

impl TimeBucketAggregator {
    pub fn new(calendar: SlotCalendar) -> Self {
        Self { calendar }
    }

    /// Run one full aggregation pass
    pub fn aggregate(&self, observations: &[Observation]) -> BucketSet {
        let mut accumulators: BTreeMap<BucketKey, BucketAccumulator> = BTreeMap::new();

        for obs in observations {
            let key = BucketKey {
                bridge_id: obs.bridge_id,
                slot: self.calendar.slot(obs.open_at),
            };
            let millis = (obs.duration_minutes.max(0.0) * 60_000.0).round() as i64;

            match accumulators.get_mut(&key) {
                Some(acc) => acc.add(obs, millis),
                None => {
                    accumulators.insert(key, BucketAccumulator::new(obs, millis));
                }
            }
        }

        let buckets: BTreeMap<BucketKey, AnalyticsBucket> = accumulators
            .into_iter()
            .map(|(key, acc)| (key, acc.finish(key)))
            .collect();

        debug!(
            observations = observations.len(),
            buckets = buckets.len(),
            "aggregated observations into time buckets"
        );

        BucketSet { buckets }
    }
}
