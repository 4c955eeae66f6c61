//! # Bridge Analytics
//!
//! Opening analytics for a network of movable bridges.
//!
//! ## Features
//!
//! - Time bucket aggregation per bridge, year, month, weekday and hour
//! - Seasonal decomposition of bucket opening counts
//! - Capacity-bounded cascade detection between bridge pairs, with insights and real-time alerts
//! - Bucket-level opening predictions
//! - ARIMA forecasts sized by an injected compute capability tier
//! - Closure streak tracking with next-opening prediction
//!
//! The analytics components never fail: missing history yields low-confidence
//! defaults. Only the boundary adapters ([`data`], [`config`]) return errors.
//!
//! ## Quick Start
//!
//! ```
//! use bridge_analytics::{AnalyticsConfig, BridgeAnalytics};
//! use bridge_events::{BridgeId, Observation};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let first = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
//! let observations: Vec<Observation> = (0..3)
//!     .map(|week| Observation::closed(1, "Fremont", first + Duration::weeks(week), 10.0))
//!     .collect();
//!
//! let analytics = BridgeAnalytics::new(AnalyticsConfig::default()).unwrap();
//! let now = first + Duration::weeks(2) + Duration::hours(6);
//! let report = analytics.run(&observations, now);
//!
//! assert_eq!(report.buckets.len(), 1);
//! assert!(report.cascade_links.is_empty());
//!
//! let prediction = report.prediction_for(BridgeId(1), first);
//! assert!((0.0..=1.0).contains(&prediction.probability));
//! ```

pub mod aggregation;
pub mod calendar;
pub mod cascade;
pub mod config;
pub mod data;
pub mod decomposition;
pub mod error;
pub mod forecaster;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prediction;
pub mod streak;
pub mod utils;

// Re-export the main types
pub use aggregation::{AnalyticsBucket, BucketKey, BucketSet, TimeBucketAggregator};
pub use calendar::{SlotCalendar, TimeSlot};
pub use cascade::{CascadeAlert, CascadeDetector, CascadeInsight, CascadeLink, CascadeType};
pub use config::AnalyticsConfig;
pub use data::{LoadReport, ObservationLoader};
pub use decomposition::SeasonalDecomposer;
pub use error::{AnalyticsError, Result};
pub use forecaster::{ArimaForecast, ArimaForecaster, ArimaModel};
pub use models::{CapabilityDescriptor, CapabilityTier, ThroughputClass};
pub use pipeline::{AnalyticsReport, BridgeAnalytics};
pub use prediction::{Prediction, PredictionEngine, PredictionSource, TimeFrame};
pub use streak::{HistoricalStreak, StreakRecord, StreakTracker, WeeklyChampion};
