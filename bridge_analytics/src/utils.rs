//! Utility functions for the bridge_analytics crate

use chrono::{DateTime, Duration, Utc};

/// Split a series into training and hold-out parts.
///
/// The hold-out is the last `min(10, n / 4)` points.
pub fn holdout_split(series: &[f64]) -> (&[f64], &[f64]) {
    let holdout = (series.len() / 4).min(10);
    series.split_at(series.len() - holdout)
}

/// Signed hours from `from` to `to`
pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

/// Duration of `hours` fractional hours, rounded to the millisecond
pub fn duration_from_hours(hours: f64) -> Duration {
    Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_holdout_split_sizes() {
        let series: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let (train, test) = holdout_split(&series);
        assert_eq!(train.len(), 18);
        assert_eq!(test.len(), 6);

        let long: Vec<f64> = vec![0.0; 168];
        assert_eq!(holdout_split(&long).1.len(), 10);

        assert_eq!(holdout_split(&[1.0, 2.0, 3.0]).1.len(), 0);
    }

    #[test]
    fn test_hours_between() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 2, 12, 30, 0).unwrap();
        assert_eq!(hours_between(start, end), 36.5);
        assert_eq!(hours_between(end, start), -36.5);
        assert_eq!(start + duration_from_hours(36.5), end);
    }
}
