//! Error types for the bridge_analytics crate
//!
//! Only the boundary adapters (configuration, CSV loading, model parameter
//! checks) return these; the analytics components degrade instead of failing.

use thiserror::Error;

/// Custom error types for the bridge_analytics crate
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from configuration parsing or checks
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from numeric primitives
    #[error("Math error: {0}")]
    MathError(#[from] bridge_math::MathError),

    /// Observation rejected at the boundary
    #[error("Observation error: {0}")]
    ObservationError(#[from] bridge_events::ObservationError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl From<toml::de::Error> for AnalyticsError {
    fn from(err: toml::de::Error) -> Self {
        AnalyticsError::ConfigError(err.to_string())
    }
}
