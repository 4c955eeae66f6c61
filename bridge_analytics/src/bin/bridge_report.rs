//! Print the analytics report for an observation CSV as JSON.
//!
//! Usage: `bridge-report <observations.csv> [config.toml]`

use bridge_analytics::logging::init_logging;
use bridge_analytics::{AnalyticsConfig, AnalyticsError, BridgeAnalytics, ObservationLoader};
use chrono::Utc;
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str = "usage: bridge-report <observations.csv> [config.toml]";

fn run() -> Result<(), AnalyticsError> {
    let mut args = env::args().skip(1);
    let csv_path = args
        .next()
        .ok_or_else(|| AnalyticsError::InvalidParameter(USAGE.to_string()))?;

    let config = match args.next() {
        Some(path) => AnalyticsConfig::from_file(path)?,
        None => AnalyticsConfig::default(),
    };

    let load = ObservationLoader::from_csv(&csv_path)?;
    info!(
        path = %csv_path,
        observations = load.observations.len(),
        rejected = load.rejected.len(),
        "observations loaded"
    );

    let analytics = BridgeAnalytics::new(config)?;
    let report = analytics.run(&load.observations, Utc::now());

    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| AnalyticsError::DataError(format!("failed to encode report: {}", err)))?;
    println!("{}", json);
    Ok(())
}

fn main() -> ExitCode {
    init_logging("info");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "bridge-report failed");
            ExitCode::FAILURE
        }
    }
}
