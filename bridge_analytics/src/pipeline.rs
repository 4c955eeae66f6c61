//! End-to-end analytics run
//!
//! [`BridgeAnalytics`] wires the components together in dependency order:
//! aggregation, decomposition, cascade detection, cascade profiles,
//! bucket forecasts, then streaks.

use crate::aggregation::{BucketSet, TimeBucketAggregator};
use crate::calendar::SlotCalendar;
use crate::cascade::{
    active_alerts, apply_cascade_profiles, insights_for, CascadeAlert, CascadeDetector,
    CascadeInsight, CascadeLink,
};
use crate::config::AnalyticsConfig;
use crate::decomposition::SeasonalDecomposer;
use crate::error::Result;
use crate::forecaster::{ArimaForecast, ArimaForecaster};
use crate::models::CapabilityDescriptor;
use crate::prediction::{Prediction, PredictionEngine};
use crate::streak::{StreakRecord, StreakTracker, WeeklyChampion};
use bridge_events::{bridge_names, BridgeId, Observation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Everything one run derives from an observation set
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub observation_count: usize,
    pub buckets: BucketSet,
    pub cascade_links: Vec<CascadeLink>,
    pub cascade_insights: Vec<CascadeInsight>,
    pub cascade_alerts: Vec<CascadeAlert>,
    pub streaks: Vec<StreakRecord>,
    pub weekly_champion: Option<WeeklyChampion>,
    #[serde(skip)]
    engine: PredictionEngine,
}

impl AnalyticsReport {
    /// Bucket-based prediction for `bridge_id` at `at`
    pub fn prediction_for(&self, bridge_id: BridgeId, at: DateTime<Utc>) -> Prediction {
        self.engine.predict(&self.buckets, bridge_id, at)
    }

    pub fn streak_for(&self, bridge_id: BridgeId) -> Option<&StreakRecord> {
        self.streaks.iter().find(|record| record.bridge_id == bridge_id)
    }

    pub fn insights_for(&self, bridge_id: BridgeId) -> impl Iterator<Item = &CascadeInsight> {
        self.cascade_insights
            .iter()
            .filter(move |insight| insight.bridge_id == bridge_id)
    }
}

/// Configured analytics entry point
#[derive(Debug, Clone)]
pub struct BridgeAnalytics {
    config: AnalyticsConfig,
    calendar: SlotCalendar,
}

impl BridgeAnalytics {
    /// Validate `config` and build the pipeline
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        let calendar = SlotCalendar::from_config(&config.calendar)?;
        Ok(Self { config, calendar })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn calendar(&self) -> &SlotCalendar {
        &self.calendar
    }

    /// Run every batch component over `observations` as of `now`
    pub fn run(&self, observations: &[Observation], now: DateTime<Utc>) -> AnalyticsReport {
        let mut buckets = TimeBucketAggregator::new(self.calendar).aggregate(observations);
        SeasonalDecomposer::new(self.config.decomposition.trend_window).decompose(&mut buckets);

        let detector = CascadeDetector::new(self.config.cascade.clone(), self.calendar);
        let cascade_links = detector.detect(observations);
        apply_cascade_profiles(&mut buckets, &cascade_links, &self.calendar);

        let engine = PredictionEngine::new(
            self.calendar,
            self.config.prediction.clone(),
            observations,
            &cascade_links,
        );
        engine.enrich(&mut buckets);

        let names = bridge_names(observations);
        let cascade_insights: Vec<CascadeInsight> = names
            .keys()
            .flat_map(|bridge_id| insights_for(*bridge_id, &cascade_links, &names))
            .collect();
        let cascade_alerts = active_alerts(observations, &cascade_links, now, &self.config.cascade);

        let tracker = StreakTracker::new(self.config.streak.clone());
        let streaks: Vec<StreakRecord> = names
            .keys()
            .map(|bridge_id| tracker.track(*bridge_id, observations, now))
            .collect();
        let weekly_champion = tracker.weekly_champion(observations, now);

        info!(
            observations = observations.len(),
            bridges = names.len(),
            buckets = buckets.len(),
            links = cascade_links.len(),
            alerts = cascade_alerts.len(),
            "analytics run complete"
        );

        AnalyticsReport {
            generated_at: now,
            observation_count: observations.len(),
            buckets,
            cascade_links,
            cascade_insights,
            cascade_alerts,
            streaks,
            weekly_champion,
            engine,
        }
    }

    /// ARIMA forecast for one bridge, seasonally nudged by `buckets` when given
    pub fn forecast(
        &self,
        bridge_id: BridgeId,
        observations: &[Observation],
        buckets: Option<&BucketSet>,
        capability: CapabilityDescriptor,
        now: DateTime<Utc>,
    ) -> ArimaForecast {
        ArimaForecaster::new(capability, self.calendar).forecast(
            bridge_id,
            observations,
            buckets,
            now,
        )
    }
}
