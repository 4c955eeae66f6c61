//! Utility functions for building observation sets
//!
//! Contains reproducible generators used by tests, benches and demos.

use crate::{BridgeId, Observation};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Generate a regular series of completed openings for one bridge
///
/// # Arguments
/// * `bridge_id` - Bridge the openings belong to
/// * `bridge_name` - Name reported for the bridge
/// * `first_open` - Open time of the first observation
/// * `interval` - Spacing between consecutive openings
/// * `count` - Number of observations to produce
/// * `duration_minutes` - Duration of every opening
pub fn observation_series(
    bridge_id: impl Into<BridgeId>,
    bridge_name: &str,
    first_open: DateTime<Utc>,
    interval: Duration,
    count: usize,
    duration_minutes: f64,
) -> Vec<Observation> {
    let bridge_id = bridge_id.into();

    (0..count)
        .map(|i| {
            Observation::closed(
                bridge_id,
                bridge_name,
                first_open + interval * i as i32,
                duration_minutes,
            )
        })
        .collect()
}

/// Generate synthetic observations for several bridges
///
/// Openings cluster around the commuter shoulders and summer afternoons,
/// roughly the way recreational boat traffic does.
///
/// # Arguments
/// * `bridge_count` - Number of bridges, numbered from 1
/// * `days` - Number of days to cover, starting 2024-05-06 (a Monday)
/// * `seed` - Seed for the random generator; equal seeds give equal output
///
/// # Returns
/// * Observations sorted by open time
pub fn generate_test_observations(bridge_count: u32, days: u32, seed: u64) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    let durations = Normal::new(12.0, 4.0).expect("constant normal parameters are valid");
    let start = Utc
        .with_ymd_and_hms(2024, 5, 6, 0, 0, 0)
        .single()
        .expect("constant start date is unambiguous");

    let mut observations = Vec::new();

    for bridge in 1..=bridge_count {
        let name = format!("Bridge {}", bridge);
        let latitude = 47.60 + bridge as f64 * 0.01;
        let longitude = -122.33 - bridge as f64 * 0.01;

        for day in 0..days {
            let day_start = start + Duration::days(day as i64);
            let openings = rng.gen_range(1..=5);

            for _ in 0..openings {
                let hour = if rng.gen_bool(0.6) {
                    rng.gen_range(10..16)
                } else {
                    rng.gen_range(5..23)
                };
                let minute = rng.gen_range(0..60);
                let duration: f64 = durations.sample(&mut rng);
                let open_at = day_start + Duration::hours(hour) + Duration::minutes(minute);

                observations.push(
                    Observation::closed(bridge, &name, open_at, duration.clamp(2.0, 45.0))
                        .with_location(latitude, longitude),
                );
            }
        }
    }

    observations.sort_by(|a, b| {
        a.open_at
            .cmp(&b.open_at)
            .then_with(|| a.bridge_id.cmp(&b.bridge_id))
    });
    observations
}
