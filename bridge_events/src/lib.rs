//! # Bridge Events
//!
//! `bridge_events` holds the raw observation model shared by the bridge
//! analytics crates. One [`Observation`] is recorded per bridge opening; the
//! close time is absent while the bridge is still up.
//!
//! ## Usage Example
//!
//! ```
//! use bridge_events::{BridgeId, Observation};
//! use chrono::{TimeZone, Utc};
//!
//! let opened = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
//! let obs = Observation::closed(1, "Fremont", opened, 10.0);
//!
//! assert_eq!(obs.bridge_id, BridgeId(1));
//! assert!(!obs.is_open());
//! assert!(obs.validate().is_ok());
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// Synthetic data generators
pub mod utils;

/// Errors raised when an observation fails boundary validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("Invalid bridge name: {0}")]
    InvalidName(String),

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

/// Identifier of a movable bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeId(pub u32);

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bridge-{}", self.0)
    }
}

impl From<u32> for BridgeId {
    fn from(id: u32) -> Self {
        BridgeId(id)
    }
}

/// A single bridge opening as reported by the upstream event store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Bridge that opened
    pub bridge_id: BridgeId,
    /// Human readable bridge name
    pub bridge_name: String,
    /// Time the bridge opened to marine traffic
    pub open_at: DateTime<Utc>,
    /// Time the bridge closed again; `None` while it is still open
    pub close_at: Option<DateTime<Utc>>,
    /// Length of the opening in minutes
    pub duration_minutes: f64,
    /// Bridge latitude in degrees
    pub latitude: f64,
    /// Bridge longitude in degrees
    pub longitude: f64,
}

impl Observation {
    /// Create a completed opening lasting `duration_minutes`
    pub fn closed(
        bridge_id: impl Into<BridgeId>,
        bridge_name: &str,
        open_at: DateTime<Utc>,
        duration_minutes: f64,
    ) -> Self {
        let millis = (duration_minutes * 60_000.0).round() as i64;
        let close_at = open_at + Duration::milliseconds(millis);

        Self {
            bridge_id: bridge_id.into(),
            bridge_name: bridge_name.to_string(),
            open_at,
            close_at: Some(close_at),
            duration_minutes,
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    /// Create an opening that has not closed yet
    pub fn open(bridge_id: impl Into<BridgeId>, bridge_name: &str, open_at: DateTime<Utc>) -> Self {
        Self {
            bridge_id: bridge_id.into(),
            bridge_name: bridge_name.to_string(),
            open_at,
            close_at: None,
            duration_minutes: 0.0,
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    /// Create an observation from explicit open and close times.
    ///
    /// The duration is derived from the two timestamps.
    pub fn between(
        bridge_id: impl Into<BridgeId>,
        bridge_name: &str,
        open_at: DateTime<Utc>,
        close_at: DateTime<Utc>,
    ) -> Self {
        let duration_minutes = (close_at - open_at).num_milliseconds() as f64 / 60_000.0;

        Self {
            bridge_id: bridge_id.into(),
            bridge_name: bridge_name.to_string(),
            open_at,
            close_at: Some(close_at),
            duration_minutes,
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    /// Attach the bridge location
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    /// Whether the bridge is still open
    pub fn is_open(&self) -> bool {
        self.close_at.is_none()
    }

    /// Time the opening ended, or the open time if it is still in progress
    pub fn end_at(&self) -> DateTime<Utc> {
        self.close_at.unwrap_or(self.open_at)
    }

    /// Check the observation against the boundary invariants.
    ///
    /// The analytics crates assume validated input; this is meant for the
    /// ingestion layer.
    pub fn validate(&self) -> Result<(), ObservationError> {
        if self.bridge_name.trim().is_empty() {
            return Err(ObservationError::InvalidName(format!(
                "{} has an empty name",
                self.bridge_id
            )));
        }

        if let Some(close_at) = self.close_at {
            if close_at < self.open_at {
                return Err(ObservationError::InvalidTiming(format!(
                    "{} closes at {} before opening at {}",
                    self.bridge_id, close_at, self.open_at
                )));
            }
        }

        if !self.duration_minutes.is_finite() || self.duration_minutes < 0.0 {
            return Err(ObservationError::InvalidDuration(format!(
                "{} has duration {}",
                self.bridge_id, self.duration_minutes
            )));
        }

        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(ObservationError::InvalidCoordinates(format!(
                "{} at ({}, {})",
                self.bridge_id, self.latitude, self.longitude
            )));
        }

        Ok(())
    }
}

/// Map every bridge seen in `observations` to its name.
///
/// When a bridge is reported under several names the lexicographically
/// smallest one wins, so the result does not depend on input order.
pub fn bridge_names(observations: &[Observation]) -> BTreeMap<BridgeId, String> {
    let mut names: BTreeMap<BridgeId, String> = BTreeMap::new();

    for obs in observations {
        match names.get_mut(&obs.bridge_id) {
            Some(existing) if obs.bridge_name < *existing => {
                *existing = obs.bridge_name.clone();
            }
            Some(_) => {}
            None => {
                names.insert(obs.bridge_id, obs.bridge_name.clone());
            }
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn opened() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_closed_observation_derives_close_time() {
        let obs = Observation::closed(7, "Ballard", opened(), 12.5);
        assert_eq!(obs.close_at, Some(opened() + Duration::seconds(750)));
        assert_eq!(obs.end_at(), opened() + Duration::seconds(750));
        assert!(!obs.is_open());
    }

    #[test]
    fn test_open_observation() {
        let obs = Observation::open(7, "Ballard", opened());
        assert!(obs.is_open());
        assert_eq!(obs.end_at(), opened());
        assert_eq!(obs.duration_minutes, 0.0);
    }

    #[test]
    fn test_between_derives_duration() {
        let obs = Observation::between(3, "University", opened(), opened() + Duration::minutes(8));
        assert_abs_diff_eq!(obs.duration_minutes, 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_validate_rejects_close_before_open() {
        let mut obs = Observation::closed(1, "Fremont", opened(), 5.0);
        obs.close_at = Some(opened() - Duration::minutes(1));
        assert!(matches!(obs.validate(), Err(ObservationError::InvalidTiming(_))));
    }

    #[test]
    fn test_validate_rejects_bad_coordinates_and_names() {
        let obs = Observation::closed(1, "Fremont", opened(), 5.0).with_location(95.0, 0.0);
        assert!(matches!(obs.validate(), Err(ObservationError::InvalidCoordinates(_))));

        let obs = Observation::closed(1, "  ", opened(), 5.0);
        assert!(matches!(obs.validate(), Err(ObservationError::InvalidName(_))));

        let obs = Observation::closed(1, "Fremont", opened(), -2.0);
        assert!(obs.validate().is_err());
    }

    #[test]
    fn test_bridge_names_is_order_independent() {
        let a = Observation::closed(1, "Fremont Bridge", opened(), 5.0);
        let b = Observation::closed(1, "Fremont", opened(), 5.0);
        let c = Observation::closed(2, "Ballard", opened(), 5.0);

        let forward = bridge_names(&[a.clone(), b.clone(), c.clone()]);
        let backward = bridge_names(&[c, b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward[&BridgeId(1)], "Fremont");
    }

    #[test]
    fn test_bridge_id_display() {
        assert_eq!(BridgeId(4).to_string(), "bridge-4");
    }
}
