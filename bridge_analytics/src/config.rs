//! Configuration for the analytics components
//!
//! Every section has a `Default` matching the production constants, so an
//! empty TOML document yields the standard behaviour.

use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest accepted lookback window in days
pub const MAX_LOOKBACK_DAYS: i64 = 3650;
/// Longest accepted cascade or alert window in minutes
pub const MAX_WINDOW_MINUTES: i64 = 24 * 60;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Calendar used to derive time buckets
    pub calendar: CalendarConfig,
    /// Trend extraction settings
    pub decomposition: DecompositionConfig,
    /// Cascade detection thresholds and caps
    pub cascade: CascadeConfig,
    /// Prediction fallbacks
    pub prediction: PredictionConfig,
    /// Streak tracking windows
    pub streak: StreakConfig,
}

/// Calendar configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Fixed offset from UTC, in minutes, used for bucket keys
    pub utc_offset_minutes: i32,
}

/// Decomposition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    /// Samples in the centered trend window
    pub trend_window: usize,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self { trend_window: 24 }
    }
}

/// Cascade detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Maximum delay between a trigger closing and a target opening
    pub window_minutes: f64,
    /// Links weaker than this are discarded
    pub min_strength: f64,
    /// Above this many observations the input is down-sampled
    pub large_dataset_threshold: usize,
    /// Most recent observations kept when down-sampling
    pub recent_observation_limit: usize,
    /// Busiest bridges kept when down-sampling
    pub max_bridges: usize,
    /// Ordered bridge pairs examined per run
    pub max_bridge_pairs: usize,
    /// Most recent trigger (and target) observations examined per pair
    pub max_observations_per_side: usize,
    /// Candidate targets scored per trigger
    pub max_targets_per_trigger: usize,
    /// Completed openings younger than this feed real-time alerts
    pub alert_lookback_minutes: i64,
    /// Alerts are raised for targets expected within this horizon
    pub alert_horizon_minutes: i64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            window_minutes: 30.0,
            min_strength: 0.4,
            large_dataset_threshold: 5000,
            recent_observation_limit: 1000,
            max_bridges: 5,
            max_bridge_pairs: 20,
            max_observations_per_side: 50,
            max_targets_per_trigger: 5,
            alert_lookback_minutes: 30,
            alert_horizon_minutes: 15,
        }
    }
}

/// Prediction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Probability reported when a slot has no history
    pub fallback_probability: f64,
    /// Duration reported when a slot has no history
    pub fallback_duration_minutes: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            fallback_probability: 0.1,
            fallback_duration_minutes: 15.0,
        }
    }
}

/// Streak tracking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Gaps longer than this count as a closure streak
    pub gap_threshold_hours: f64,
    /// History considered for a single bridge
    pub lookback_days: i64,
    /// History considered when comparing bridges
    pub comparison_lookback_days: i64,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            gap_threshold_hours: 12.0,
            lookback_days: 30,
            comparison_lookback_days: 7,
        }
    }
}

impl AnalyticsConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AnalyticsConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check that every threshold is in range and every cap is finite and positive
    pub fn validate(&self) -> Result<()> {
        if self.calendar.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(AnalyticsError::ConfigError(format!(
                "calendar.utc_offset_minutes must be within a day, got {}",
                self.calendar.utc_offset_minutes
            )));
        }

        if self.decomposition.trend_window == 0 {
            return Err(AnalyticsError::ConfigError(
                "decomposition.trend_window must be positive".to_string(),
            ));
        }

        let cascade = &self.cascade;
        let window = cascade.window_minutes;
        if !(window > 0.0 && window <= MAX_WINDOW_MINUTES as f64) {
            return Err(AnalyticsError::ConfigError(format!(
                "cascade.window_minutes must be within (0, {}]",
                MAX_WINDOW_MINUTES
            )));
        }
        if !(0.0..=1.0).contains(&cascade.min_strength) {
            return Err(AnalyticsError::ConfigError(format!(
                "cascade.min_strength must be within [0, 1], got {}",
                cascade.min_strength
            )));
        }
        let caps = [
            ("large_dataset_threshold", cascade.large_dataset_threshold),
            ("recent_observation_limit", cascade.recent_observation_limit),
            ("max_bridges", cascade.max_bridges),
            ("max_bridge_pairs", cascade.max_bridge_pairs),
            ("max_observations_per_side", cascade.max_observations_per_side),
            ("max_targets_per_trigger", cascade.max_targets_per_trigger),
        ];
        if let Some((name, _)) = caps.iter().find(|(_, value)| *value == 0) {
            return Err(AnalyticsError::ConfigError(format!(
                "cascade.{} must be positive",
                name
            )));
        }
        let alert_windows = [cascade.alert_lookback_minutes, cascade.alert_horizon_minutes];
        if alert_windows
            .iter()
            .any(|minutes| !(1..=MAX_WINDOW_MINUTES).contains(minutes))
        {
            return Err(AnalyticsError::ConfigError(format!(
                "cascade alert windows must be within [1, {}] minutes",
                MAX_WINDOW_MINUTES
            )));
        }

        if !(0.0..=1.0).contains(&self.prediction.fallback_probability) {
            return Err(AnalyticsError::ConfigError(
                "prediction.fallback_probability must be within [0, 1]".to_string(),
            ));
        }
        if self.prediction.fallback_duration_minutes < 0.0 {
            return Err(AnalyticsError::ConfigError(
                "prediction.fallback_duration_minutes must not be negative".to_string(),
            ));
        }

        let streak = &self.streak;
        if !(streak.gap_threshold_hours > 0.0) {
            return Err(AnalyticsError::ConfigError(
                "streak.gap_threshold_hours must be positive".to_string(),
            ));
        }
        let lookbacks = [
            ("lookback_days", streak.lookback_days),
            ("comparison_lookback_days", streak.comparison_lookback_days),
        ];
        if let Some((name, days)) = lookbacks
            .iter()
            .find(|(_, days)| !(1..=MAX_LOOKBACK_DAYS).contains(days))
        {
            return Err(AnalyticsError::ConfigError(format!(
                "streak.{} must be within [1, {}], got {}",
                name, MAX_LOOKBACK_DAYS, days
            )));
        }

        Ok(())
    }
}
