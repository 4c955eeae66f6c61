//! Cross-bridge cascade analysis
//!
//! [`CascadeDetector`] finds scored links between one bridge closing and
//! another opening shortly after; the `insights` functions turn those links
//! into bucket fields, per-bridge summaries and real-time alerts.

pub mod detector;
pub mod insights;

pub use detector::{CascadeDetector, CascadeLink, CascadeType};
pub use insights::{
    active_alerts, apply_cascade_profiles, insights_for, CascadeAlert, CascadeDirection,
    CascadeInsight,
};
