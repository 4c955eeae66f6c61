//! Compute capability tiers
//!
//! The forecaster never inspects the host itself; callers inject a
//! [`CapabilityDescriptor`] and the tier table below decides how heavy the
//! model may be.

use super::arima::TrainingMethod;
use serde::{Deserialize, Serialize};

/// Coarse throughput class of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThroughputClass {
    Low,
    Standard,
    High,
}

/// Description of the compute available to the forecaster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub cores: usize,
    pub throughput: ThroughputClass,
}

impl CapabilityDescriptor {
    pub fn new(cores: usize, throughput: ThroughputClass) -> Self {
        Self { cores, throughput }
    }

    /// Descriptor of the current host with standard throughput
    pub fn detect() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(cores, ThroughputClass::Standard)
    }

    pub fn tier(&self) -> CapabilityTier {
        match (self.throughput, self.cores) {
            (ThroughputClass::Low, _) => CapabilityTier::Basic,
            (ThroughputClass::High, cores) if cores >= 6 => CapabilityTier::Advanced,
            (_, cores) if cores >= 8 => CapabilityTier::Advanced,
            (_, cores) if cores >= 4 => CapabilityTier::Moderate,
            _ => CapabilityTier::Basic,
        }
    }
}

/// Model complexity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTier {
    Basic,
    Moderate,
    Advanced,
}

/// ARIMA `(p, d, q)` order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Everything a tier fixes about the forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierProfile {
    pub order: ArimaOrder,
    /// Most recent series points used for training
    pub max_series_length: usize,
    /// Fewer samples than this switches to the frequency fallback
    pub min_training_samples: usize,
    /// Width of one series window in minutes
    pub window_minutes: i64,
    pub training: TrainingMethod,
}

impl CapabilityTier {
    pub fn profile(&self) -> TierProfile {
        match self {
            CapabilityTier::Basic => TierProfile {
                order: ArimaOrder { p: 1, d: 1, q: 1 },
                max_series_length: 24,
                min_training_samples: 12,
                window_minutes: 60,
                training: TrainingMethod::LagCorrelation,
            },
            CapabilityTier::Moderate => TierProfile {
                order: ArimaOrder { p: 2, d: 1, q: 2 },
                max_series_length: 72,
                min_training_samples: 24,
                window_minutes: 60,
                training: TrainingMethod::YuleWalker,
            },
            CapabilityTier::Advanced => TierProfile {
                order: ArimaOrder { p: 3, d: 1, q: 3 },
                max_series_length: 168,
                min_training_samples: 48,
                window_minutes: 30,
                training: TrainingMethod::GradientDescent,
            },
        }
    }
}
