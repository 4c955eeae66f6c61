use approx::assert_abs_diff_eq;
use bridge_analytics::{AnalyticsConfig, BridgeAnalytics, CascadeType, PredictionSource};
use bridge_events::utils::generate_test_observations;
use bridge_events::{BridgeId, Observation};
use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

fn analytics() -> BridgeAnalytics {
    BridgeAnalytics::new(AnalyticsConfig::default()).unwrap()
}

fn jan(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
}

#[test]
fn test_weekly_opening_single_bridge() {
    // Mondays the 1st, 8th and 15th at 09:00 for ten minutes
    let observations: Vec<Observation> = [1, 8, 15]
        .iter()
        .map(|day| Observation::closed(1, "Fremont", jan(*day, 9, 0), 10.0))
        .collect();
    let now = jan(15, 21, 30);

    let report = analytics().run(&observations, now);

    assert_eq!(report.buckets.len(), 1);
    let bucket = report.buckets.iter().next().unwrap();
    assert_eq!(bucket.opening_count, 3);
    assert_eq!(bucket.slot().day_of_week, 2);
    assert_eq!(bucket.slot().hour, 9);
    assert_eq!(bucket.average_duration, 10.0);
    assert_eq!(bucket.longest_duration, 10.0);
    assert_eq!(bucket.shortest_duration, 10.0);
    assert_eq!(bucket.total_minutes_open, 30.0);

    assert!(report.cascade_links.is_empty());
    assert!(report.cascade_alerts.is_empty());

    let streak = report.streak_for(BridgeId(1)).unwrap();
    assert_abs_diff_eq!(streak.current_streak_hours, 12.5, epsilon = 1e-9);
    assert_eq!(streak.streak_count, 2);
    assert_eq!(streak.last_opening_at, Some(jan(15, 9, 0)));

    let champion = report.weekly_champion.as_ref().unwrap();
    assert_eq!(champion.bridge_id, BridgeId(1));

    let prediction = report.prediction_for(BridgeId(1), jan(22, 9, 15));
    assert_eq!(prediction.source, PredictionSource::Historical);
    assert!((0.0..=1.0).contains(&prediction.probability));
}

#[test]
fn test_five_week_cascade_between_two_bridges() {
    let mut observations = Vec::new();
    for week in 0..5 {
        let fremont_open = jan(2, 14, 0) + Duration::weeks(week);
        let fremont = Observation::closed(1, "Fremont", fremont_open, 8.0);
        let ballard_open = fremont.end_at() + Duration::minutes(10);
        observations.push(fremont);
        observations.push(Observation::closed(2, "Ballard", ballard_open, 12.0));
    }
    let now = jan(30, 14, 30);

    let report = analytics().run(&observations, now);

    assert_eq!(report.cascade_links.len(), 5);
    for link in &report.cascade_links {
        assert_eq!(link.trigger_bridge_id, BridgeId(1));
        assert_eq!(link.target_bridge_id, BridgeId(2));
        assert_eq!(link.cascade_type, CascadeType::ShortTerm);
        assert_abs_diff_eq!(link.delay_minutes, 10.0);
        assert!(link.strength >= 0.4);
    }

    let insights: Vec<_> = report.insights_for(BridgeId(1)).collect();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].related_bridge_id, BridgeId(2));
    assert_eq!(insights[0].link_count, 5);
    assert_eq!(insights[0].description, "triggers Ballard within 10 min");

    // Fremont closed at 14:08 today and Ballard follows ten minutes later
    let alert_time = jan(30, 14, 10);
    let alerts = analytics().run(&observations, alert_time).cascade_alerts;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].expected_at, jan(30, 14, 18));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["cascade_links"][0]["type"], "short-term");
}

#[test]
fn test_report_on_generated_network() {
    let observations = generate_test_observations(4, 21, 11);
    let now = Utc.with_ymd_and_hms(2024, 5, 27, 0, 0, 0).unwrap();

    let report = analytics().run(&observations, now);

    assert_eq!(report.observation_count, observations.len());
    assert_eq!(report.streaks.len(), 4);
    assert!(report.weekly_champion.is_some());

    let total: u32 = report.buckets.iter().map(|bucket| bucket.opening_count).sum();
    assert_eq!(total as usize, observations.len());
    for bucket in report.buckets.iter() {
        assert!(bucket.shortest_duration <= bucket.average_duration);
        assert!(bucket.average_duration <= bucket.longest_duration);
        assert!((0.0..=1.0).contains(&bucket.cascade.influence));
        assert!((0.0..=1.0).contains(&bucket.cascade.susceptibility));
    }
    for link in &report.cascade_links {
        assert_ne!(link.trigger_bridge_id, link.target_bridge_id);
        assert!(link.delay_minutes > 0.0 && link.delay_minutes <= 30.0);
    }
}
