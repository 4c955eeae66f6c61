//! # Bridge Watch
//!
//! Umbrella crate for the movable bridge analytics workspace.
//!
//! - [`bridge_events`]: the raw observation model and synthetic generators
//! - [`bridge_math`]: statistics and autoregressive primitives
//! - [`bridge_analytics`]: aggregation, cascades, predictions, forecasts and streaks
//!
//! ## Example
//!
//! ```
//! use bridge_watch::bridge_analytics::{AnalyticsConfig, BridgeAnalytics};
//! use bridge_watch::bridge_events::utils::generate_test_observations;
//! use chrono::{TimeZone, Utc};
//!
//! let observations = generate_test_observations(3, 14, 42);
//! let now = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
//!
//! let analytics = BridgeAnalytics::new(AnalyticsConfig::default()).unwrap();
//! let report = analytics.run(&observations, now);
//!
//! assert_eq!(report.streaks.len(), 3);
//! assert!(report.weekly_champion.is_some());
//! ```

pub use bridge_analytics;
pub use bridge_events;
pub use bridge_math;
