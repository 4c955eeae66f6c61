//! # Bridge Math
//!
//! Numeric building blocks for the bridge analytics crates.
//! This crate provides the smoothing, descriptive statistics and
//! autoregressive estimation routines the analytics components share.

use thiserror::Error;

pub mod forecasting;
pub mod moving_averages;
pub mod statistics;

pub use moving_averages::centered_moving_average;
pub use statistics::{clamp_symmetric, clamp_unit};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
