use bridge_events::utils::generate_test_observations;
use bridge_events::{BridgeId, Observation};
use chrono::{TimeZone, Utc};
use serde_json::json;

#[test]
fn test_observation_json_shape() {
    let opened = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
    let obs = Observation::open(4, "Montlake", opened).with_location(47.647, -122.304);

    let value = serde_json::to_value(&obs).unwrap();
    assert_eq!(value["bridge_id"], json!(4));
    assert_eq!(value["close_at"], json!(null));
    assert_eq!(value["open_at"], json!("2024-06-03T09:00:00Z"));

    let parsed: Observation = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.bridge_id, BridgeId(4));
    assert!(parsed.is_open());
}

#[test]
fn test_generated_observations_cover_every_bridge_and_day() {
    let observations = generate_test_observations(3, 14, 7);

    for bridge in 1..=3 {
        let count = observations
            .iter()
            .filter(|obs| obs.bridge_id == BridgeId(bridge))
            .count();
        assert!((14..=70).contains(&count));
    }
    assert!(observations
        .iter()
        .all(|obs| (2.0..=45.0).contains(&obs.duration_minutes)));
}
