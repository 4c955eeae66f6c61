use bridge_analytics::{AnalyticsConfig, AnalyticsError, BridgeAnalytics};
use bridge_events::utils::generate_test_observations;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_config_file_round_trip() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[calendar]
utc_offset_minutes = -420

[cascade]
window_minutes = 45.0
max_bridge_pairs = 10

[streak]
gap_threshold_hours = 8.0
"#
    )
    .unwrap();

    let config = AnalyticsConfig::from_file(file.path()).unwrap();
    assert_eq!(config.calendar.utc_offset_minutes, -420);
    assert_eq!(config.cascade.window_minutes, 45.0);
    assert_eq!(config.cascade.max_bridge_pairs, 10);
    assert_eq!(config.streak.gap_threshold_hours, 8.0);
    // Untouched sections keep their defaults
    assert_eq!(config.prediction, AnalyticsConfig::default().prediction);
    assert_eq!(config.cascade.max_targets_per_trigger, 5);

    let analytics = BridgeAnalytics::new(config).unwrap();
    assert_eq!(analytics.calendar().offset().local_minus_utc(), -420 * 60);
}

#[test]
fn test_out_of_range_values_are_config_errors() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[cascade]\nmin_strength = 1.5").unwrap();

    let err = AnalyticsConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, AnalyticsError::ConfigError(_)));
    assert!(err.to_string().contains("min_strength"));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = AnalyticsConfig::from_toml_str("[cascade\nwindow_minutes = ").unwrap_err();
    assert!(matches!(err, AnalyticsError::ConfigError(_)));
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AnalyticsConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, AnalyticsError::IoError(_)));
}

#[rstest]
#[case("[streak]\nlookback_days = 9223372036854775807")]
#[case("[streak]\ncomparison_lookback_days = 3651")]
#[case("[cascade]\nalert_lookback_minutes = 9223372036854775807")]
#[case("[cascade]\nalert_horizon_minutes = 1441")]
#[case("[cascade]\nwindow_minutes = 1e300")]
fn test_window_bounds_are_enforced(#[case] source: &str) {
    let err = AnalyticsConfig::from_toml_str(source).unwrap_err();
    assert!(matches!(err, AnalyticsError::ConfigError(_)));
}

#[test]
fn test_widest_accepted_windows_run_cleanly() {
    let config = AnalyticsConfig::from_toml_str(
        "[streak]\nlookback_days = 3650\ncomparison_lookback_days = 3650\n\
         [cascade]\nwindow_minutes = 1440.0\n\
         alert_lookback_minutes = 1440\nalert_horizon_minutes = 1440\n",
    )
    .unwrap();

    let observations = generate_test_observations(3, 10, 5);
    let now = Utc.with_ymd_and_hms(2024, 5, 16, 0, 0, 0).unwrap();
    let report = BridgeAnalytics::new(config).unwrap().run(&observations, now);
    assert_eq!(report.streaks.len(), 3);
}
