//! CSV ingestion of bridge observations
//!
//! This is a boundary adapter: rows that violate the observation invariants
//! are collected into [`LoadReport::rejected`] instead of reaching the
//! analytics core. Only I/O failures and malformed CSV abort a load.

use crate::error::Result;
use bridge_events::{BridgeId, Observation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// One CSV row as written by the upstream event store
#[derive(Debug, Clone, Deserialize)]
struct ObservationRow {
    bridge_id: u32,
    bridge_name: String,
    open_at: DateTime<Utc>,
    close_at: Option<DateTime<Utc>>,
    duration_minutes: Option<f64>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl ObservationRow {
    fn into_observation(self) -> Observation {
        // A missing duration is derived from the timestamps; still-open rows get zero
        let duration_minutes = match (self.duration_minutes, self.close_at) {
            (Some(duration), _) => duration,
            (None, Some(close_at)) => {
                (close_at - self.open_at).num_milliseconds() as f64 / 60_000.0
            }
            (None, None) => 0.0,
        };

        Observation {
            bridge_id: BridgeId(self.bridge_id),
            bridge_name: self.bridge_name.trim().to_string(),
            open_at: self.open_at,
            close_at: self.close_at,
            duration_minutes,
            latitude: self.latitude.unwrap_or(0.0),
            longitude: self.longitude.unwrap_or(0.0),
        }
    }
}

/// A row that could not be turned into a valid observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    /// 1-based line number in the source, header included
    pub line: u64,
    pub reason: String,
}

/// Outcome of loading one CSV source
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Valid observations sorted by open time
    pub observations: Vec<Observation>,
    pub rejected: Vec<RejectedRow>,
}

/// Loader for observation CSV files
#[derive(Debug)]
pub struct ObservationLoader;

impl ObservationLoader {
    /// Load observations from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<LoadReport> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load observations from any CSV reader with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<LoadReport> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let mut report = LoadReport::default();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = record
                .position()
                .map(|position| position.line())
                .unwrap_or(index as u64 + 2);

            let row: ObservationRow = match record.deserialize(Some(&headers)) {
                Ok(row) => row,
                Err(err) => {
                    report.rejected.push(RejectedRow {
                        line,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let observation = row.into_observation();
            match observation.validate() {
                Ok(()) => report.observations.push(observation),
                Err(err) => report.rejected.push(RejectedRow {
                    line,
                    reason: err.to_string(),
                }),
            }
        }

        report
            .observations
            .sort_by(|a, b| a.open_at.cmp(&b.open_at).then(a.bridge_id.cmp(&b.bridge_id)));

        if !report.rejected.is_empty() {
            warn!(rejected = report.rejected.len(), "skipped invalid observation rows");
        }
        debug!(observations = report.observations.len(), "loaded observations");

        Ok(report)
    }
}
