use bridge_analytics::forecaster::ArimaForecaster;
use bridge_analytics::models::{ArimaEstimator, ForecastModel, TrainedForecastModel};
use bridge_analytics::{
    AnalyticsConfig, BridgeAnalytics, CapabilityDescriptor, CapabilityTier, PredictionSource,
    SlotCalendar, ThroughputClass,
};
use bridge_events::utils::{generate_test_observations, observation_series};
use bridge_events::BridgeId;
use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;

#[test]
fn test_basic_tier_with_ten_samples_falls_back() {
    let first = Utc.with_ymd_and_hms(2024, 6, 3, 6, 0, 0).unwrap();
    let observations = observation_series(1, "Fremont", first, Duration::hours(1), 10, 8.0);
    let now = first + Duration::hours(10);

    let forecaster = ArimaForecaster::new(
        CapabilityDescriptor::new(2, ThroughputClass::Standard),
        SlotCalendar::utc(),
    );
    assert_eq!(forecaster.tier(), CapabilityTier::Basic);

    let forecast = forecaster.forecast(BridgeId(1), &observations, None, now);
    assert!(forecast.model.is_none());
    assert_eq!(forecast.prediction.source, PredictionSource::Frequency);
    assert_eq!(forecast.prediction.confidence, 0.3);
    // Ten openings over ten hours
    let expected = 1.0 - (-1.0f64).exp();
    assert!((forecast.prediction.probability - expected).abs() < 1e-9);
    assert_eq!(forecast.prediction.expected_duration_minutes, 8.0);
}

#[rstest]
#[case(2, ThroughputClass::Standard, CapabilityTier::Basic)]
#[case(4, ThroughputClass::Standard, CapabilityTier::Moderate)]
#[case(8, ThroughputClass::High, CapabilityTier::Advanced)]
fn test_trained_forecast_per_tier(
    #[case] cores: usize,
    #[case] throughput: ThroughputClass,
    #[case] tier: CapabilityTier,
) {
    let observations = generate_test_observations(1, 30, 21);
    let now = Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap();

    let analytics = BridgeAnalytics::new(AnalyticsConfig::default()).unwrap();
    let report = analytics.run(&observations, now);
    let forecast = analytics.forecast(
        BridgeId(1),
        &observations,
        Some(&report.buckets),
        CapabilityDescriptor::new(cores, throughput),
        now,
    );

    let model = forecast.model.expect("thirty days of openings train every tier");
    assert_eq!(model.tier, tier);
    assert_eq!(model.ar_coefficients.len(), tier.profile().order.p);
    assert_eq!(model.ma_coefficients.len(), tier.profile().order.q);
    assert_eq!(model.training_sample_size, tier.profile().max_series_length);
    assert!(model.accuracy >= 0.5 && model.accuracy <= 1.0);
    assert_eq!(model.trained_at, now);

    let prediction = forecast.prediction;
    assert_eq!(prediction.source, PredictionSource::Arima);
    assert!((0.0..=1.0).contains(&prediction.probability));
    assert_eq!(prediction.confidence, model.accuracy);
    assert!(prediction.expected_duration_minutes >= 2.0);
}

#[test]
fn test_estimator_round_trip_on_periodic_series() {
    let series: Vec<f64> = (0..72)
        .map(|i| 0.5 + 0.4 * (i as f64 * std::f64::consts::PI / 12.0).sin())
        .collect();

    let trained = ArimaEstimator::for_tier(CapabilityTier::Moderate)
        .train(&series)
        .unwrap();
    let forecast = trained.forecast(6).unwrap();

    assert_eq!(forecast.horizons(), 6);
    assert!(forecast.values().iter().all(|v| v.is_finite()));
    assert!(trained.ar_coefficients().iter().all(|c| c.abs() <= 0.8));
}
