//! Closure streak tracking
//!
//! A streak is a stretch of more than `gap_threshold_hours` in which a bridge
//! stayed closed to marine traffic. The tracker also predicts the next
//! opening from the mean interval between openings.

use crate::config::StreakConfig;
use crate::utils::{duration_from_hours, hours_between};
use bridge_events::{bridge_names, BridgeId, Observation};
use bridge_math::statistics::{coefficient_of_variation, mean};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// One closed stretch between two openings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalStreak {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_hours: f64,
}

/// Streak statistics of one bridge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakRecord {
    pub bridge_id: BridgeId,
    pub bridge_name: String,
    /// Hours since the latest opening; zero while the bridge is open
    pub current_streak_hours: f64,
    pub longest_streak_hours: f64,
    pub average_streak_hours: f64,
    pub streak_count: usize,
    pub last_opening_at: Option<DateTime<Utc>>,
    pub predicted_next_opening_at: Option<DateTime<Utc>>,
    /// Within `[0.1, 0.95]` when there is history, zero otherwise
    pub confidence: f64,
    pub historical_streaks: Vec<HistoricalStreak>,
}

impl StreakRecord {
    fn empty(bridge_id: BridgeId, bridge_name: String) -> Self {
        Self {
            bridge_id,
            bridge_name,
            current_streak_hours: 0.0,
            longest_streak_hours: 0.0,
            average_streak_hours: 0.0,
            streak_count: 0,
            last_opening_at: None,
            predicted_next_opening_at: None,
            confidence: 0.0,
            historical_streaks: Vec::new(),
        }
    }
}

/// Bridge with the longest current streak over the comparison window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyChampion {
    pub bridge_id: BridgeId,
    pub bridge_name: String,
    pub current_streak_hours: f64,
    pub longest_streak_hours: f64,
}

/// Computes streak records from raw observations
#[derive(Debug, Clone, Default)]
pub struct StreakTracker {
    config: StreakConfig,
}

impl StreakTracker {
    pub fn new(config: StreakConfig) -> Self {
        Self { config }
    }

    /// Streak record over the default lookback window
    pub fn track(
        &self,
        bridge_id: BridgeId,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> StreakRecord {
        self.track_with_lookback(bridge_id, observations, now, self.config.lookback_days)
    }

    /// Streak record with historical streaks limited to the last `lookback_days`
    pub fn track_with_lookback(
        &self,
        bridge_id: BridgeId,
        observations: &[Observation],
        now: DateTime<Utc>,
        lookback_days: i64,
    ) -> StreakRecord {
        let mut history: Vec<&Observation> = observations
            .iter()
            .filter(|obs| obs.bridge_id == bridge_id && obs.open_at <= now)
            .collect();
        history.sort_by(|a, b| a.open_at.cmp(&b.open_at));

        let bridge_name = bridge_names(observations)
            .remove(&bridge_id)
            .unwrap_or_default();
        let Some(latest) = history.last() else {
            return StreakRecord::empty(bridge_id, bridge_name);
        };

        let current_streak_hours = if latest.is_open() {
            0.0
        } else {
            hours_between(latest.open_at, now).max(0.0)
        };
        let last_opening_at = Some(latest.open_at);

        let window_start = now - Duration::days(lookback_days);
        let window: Vec<&Observation> = history
            .iter()
            .copied()
            .filter(|obs| obs.open_at >= window_start)
            .collect();

        let historical_streaks: Vec<HistoricalStreak> = window
            .windows(2)
            .filter_map(|pair| {
                let start_at = pair[0].end_at();
                let end_at = pair[1].open_at;
                let duration_hours = hours_between(start_at, end_at);
                (duration_hours > self.config.gap_threshold_hours).then_some(HistoricalStreak {
                    start_at,
                    end_at,
                    duration_hours,
                })
            })
            .collect();

        let durations: Vec<f64> = historical_streaks.iter().map(|s| s.duration_hours).collect();
        let longest_streak_hours = durations.iter().cloned().fold(0.0, f64::max);
        let average_streak_hours = mean(&durations);

        let intervals: Vec<f64> = window
            .windows(2)
            .map(|pair| hours_between(pair[0].open_at, pair[1].open_at))
            .collect();

        let (predicted_next_opening_at, confidence) = if intervals.is_empty() {
            (None, 0.3)
        } else {
            let predicted_hours = (mean(&intervals) - current_streak_hours).max(0.0);
            let confidence = if intervals.len() < 3 {
                0.3
            } else {
                let cv = coefficient_of_variation(&intervals).unwrap_or(1.0);
                (1.0 - cv).clamp(0.1, 0.95)
            };
            (Some(now + duration_from_hours(predicted_hours)), confidence)
        };

        StreakRecord {
            bridge_id,
            bridge_name,
            current_streak_hours,
            longest_streak_hours,
            average_streak_hours,
            streak_count: historical_streaks.len(),
            last_opening_at,
            predicted_next_opening_at,
            confidence,
            historical_streaks,
        }
    }

    /// Records of every bridge active in the comparison window, longest current streak first
    pub fn compare(&self, observations: &[Observation], now: DateTime<Utc>) -> Vec<StreakRecord> {
        let window_start = now - Duration::days(self.config.comparison_lookback_days);
        let active: BTreeSet<BridgeId> = observations
            .iter()
            .filter(|obs| obs.open_at >= window_start && obs.open_at <= now)
            .map(|obs| obs.bridge_id)
            .collect();

        let mut records: Vec<StreakRecord> = active
            .into_iter()
            .map(|bridge_id| {
                self.track_with_lookback(
                    bridge_id,
                    observations,
                    now,
                    self.config.comparison_lookback_days,
                )
            })
            .collect();

        records.sort_by(|a, b| {
            b.current_streak_hours
                .total_cmp(&a.current_streak_hours)
                .then(a.bridge_id.cmp(&b.bridge_id))
        });
        records
    }

    /// Bridge with the greatest current streak; ties go to the lower id
    pub fn weekly_champion(
        &self,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> Option<WeeklyChampion> {
        self.compare(observations, now)
            .into_iter()
            .next()
            .map(|record| WeeklyChampion {
                bridge_id: record.bridge_id,
                bridge_name: record.bridge_name,
                current_streak_hours: record.current_streak_hours,
                longest_streak_hours: record.longest_streak_hours,
            })
    }
}
