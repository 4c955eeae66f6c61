//! Views derived from detected cascade links
//!
//! - Per-bucket influence and susceptibility
//! - Per-bridge insight lines
//! - Real-time alerts for targets expected to open soon

use super::detector::{CascadeLink, CascadeType};
use crate::aggregation::{BucketSet, CascadeProfile};
use crate::calendar::SlotCalendar;
use crate::config::CascadeConfig;
use bridge_events::{bridge_names, BridgeId, Observation};
use bridge_math::clamp_unit;
use bridge_math::statistics::mean;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

type SlotKey = (BridgeId, u32, u32);

/// Fill the cascade fields of every bucket from `links`.
///
/// Outgoing links are matched on the trigger's closing slot, incoming links
/// on the target's opening slot, both by `(day_of_week, hour)`.
pub fn apply_cascade_profiles(set: &mut BucketSet, links: &[CascadeLink], calendar: &SlotCalendar) {
    let mut outgoing: HashMap<SlotKey, Vec<&CascadeLink>> = HashMap::new();
    let mut incoming: HashMap<SlotKey, Vec<&CascadeLink>> = HashMap::new();

    for link in links {
        let trigger_slot = calendar.slot(link.trigger_at);
        outgoing
            .entry((link.trigger_bridge_id, trigger_slot.day_of_week, trigger_slot.hour))
            .or_default()
            .push(link);

        let target_slot = calendar.slot(link.target_at);
        incoming
            .entry((link.target_bridge_id, target_slot.day_of_week, target_slot.hour))
            .or_default()
            .push(link);
    }

    for bucket in set.iter_mut() {
        let slot = bucket.slot();
        let key = (bucket.bridge_id(), slot.day_of_week, slot.hour);
        let count = bucket.opening_count as f64;
        let empty = Vec::new();
        let out = outgoing.get(&key).unwrap_or(&empty);
        let inc = incoming.get(&key).unwrap_or(&empty);

        let mut profile = CascadeProfile {
            influence: weighted_strength(out, count),
            susceptibility: weighted_strength(inc, count),
            ..CascadeProfile::default()
        };

        if let Some((target, to_target)) = primary_target(out) {
            let delays: Vec<f64> = to_target.iter().map(|link| link.delay_minutes).collect();
            profile.primary_cascade_target = Some(target);
            profile.cascade_delay = mean(&delays);
            profile.cascade_probability = (to_target.len() as f64 / count).min(1.0);
        }

        bucket.cascade = profile;
    }
}

/// Mean strength scaled by how often the slot participates at all
fn weighted_strength(links: &[&CascadeLink], opening_count: f64) -> f64 {
    if links.is_empty() || opening_count <= 0.0 {
        return 0.0;
    }
    let strengths: Vec<f64> = links.iter().map(|link| link.strength).collect();
    clamp_unit(mean(&strengths) * (links.len() as f64 / opening_count).min(1.0))
}

/// Target with the most links; ties go to the greater total strength, then the lower id
fn primary_target<'a>(links: &[&'a CascadeLink]) -> Option<(BridgeId, Vec<&'a CascadeLink>)> {
    let mut by_target: BTreeMap<BridgeId, Vec<&CascadeLink>> = BTreeMap::new();
    for link in links {
        by_target.entry(link.target_bridge_id).or_default().push(*link);
    }

    let mut best: Option<(BridgeId, Vec<&CascadeLink>)> = None;
    for (target, group) in by_target {
        let better = match &best {
            None => true,
            Some((_, current)) => {
                group.len() > current.len()
                    || (group.len() == current.len()
                        && total_strength(&group) > total_strength(current))
            }
        };
        if better {
            best = Some((target, group));
        }
    }
    best
}

fn total_strength(links: &[&CascadeLink]) -> f64 {
    links.iter().map(|link| link.strength).sum()
}

/// Role of a bridge in an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeDirection {
    /// The bridge's closings precede the related bridge opening
    Triggers,
    /// The bridge opens after the related bridge closes
    TriggeredBy,
}

/// Summary of one bridge's cascade relation with another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeInsight {
    pub bridge_id: BridgeId,
    pub related_bridge_id: BridgeId,
    pub related_bridge_name: String,
    pub direction: CascadeDirection,
    pub link_count: usize,
    pub average_delay_minutes: f64,
    pub average_strength: f64,
    pub description: String,
}

/// Insight lines for `bridge_id`, most frequent relation first
pub fn insights_for(
    bridge_id: BridgeId,
    links: &[CascadeLink],
    names: &BTreeMap<BridgeId, String>,
) -> Vec<CascadeInsight> {
    let mut grouped: BTreeMap<(BridgeId, bool), Vec<&CascadeLink>> = BTreeMap::new();
    for link in links {
        if link.trigger_bridge_id == bridge_id {
            grouped.entry((link.target_bridge_id, true)).or_default().push(link);
        } else if link.target_bridge_id == bridge_id {
            grouped.entry((link.trigger_bridge_id, false)).or_default().push(link);
        }
    }

    let mut insights: Vec<CascadeInsight> = grouped
        .into_iter()
        .map(|((related, outgoing), group)| {
            let delays: Vec<f64> = group.iter().map(|link| link.delay_minutes).collect();
            let strengths: Vec<f64> = group.iter().map(|link| link.strength).collect();
            let average_delay_minutes = mean(&delays);
            let related_bridge_name = names
                .get(&related)
                .cloned()
                .unwrap_or_else(|| related.to_string());

            let (direction, description) = if outgoing {
                (
                    CascadeDirection::Triggers,
                    format!(
                        "triggers {} within {} min",
                        related_bridge_name,
                        average_delay_minutes.round().max(1.0)
                    ),
                )
            } else {
                (
                    CascadeDirection::TriggeredBy,
                    format!(
                        "follows {} within {} min",
                        related_bridge_name,
                        average_delay_minutes.round().max(1.0)
                    ),
                )
            };

            CascadeInsight {
                bridge_id,
                related_bridge_id: related,
                related_bridge_name,
                direction,
                link_count: group.len(),
                average_delay_minutes,
                average_strength: mean(&strengths),
                description,
            }
        })
        .collect();

    insights.sort_by(|a, b| {
        b.link_count
            .cmp(&a.link_count)
            .then(b.average_strength.total_cmp(&a.average_strength))
            .then(a.related_bridge_id.cmp(&b.related_bridge_id))
    });
    insights
}

/// A target bridge expected to open because a trigger just closed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeAlert {
    pub trigger_bridge_id: BridgeId,
    pub trigger_bridge_name: String,
    pub target_bridge_id: BridgeId,
    pub target_bridge_name: String,
    /// When the trigger bridge closed
    pub triggered_at: DateTime<Utc>,
    pub expected_at: DateTime<Utc>,
    pub probability: f64,
    #[serde(rename = "type")]
    pub cascade_type: CascadeType,
}

/// Project cascade targets from recently completed openings.
///
/// Openings that closed within the alert lookback are matched against the
/// historical links of their bridge; a target is reported when its mean
/// delay puts the expected opening within the alert horizon from `now`.
pub fn active_alerts(
    observations: &[Observation],
    links: &[CascadeLink],
    now: DateTime<Utc>,
    config: &CascadeConfig,
) -> Vec<CascadeAlert> {
    let names = bridge_names(observations);
    let lookback_start = now - Duration::minutes(config.alert_lookback_minutes);
    let horizon_end = now + Duration::minutes(config.alert_horizon_minutes);

    let mut history: BTreeMap<(BridgeId, BridgeId), Vec<&CascadeLink>> = BTreeMap::new();
    for link in links {
        history
            .entry((link.trigger_bridge_id, link.target_bridge_id))
            .or_default()
            .push(link);
    }

    let mut alerts = Vec::new();
    for obs in observations {
        let Some(closed_at) = obs.close_at else {
            continue;
        };
        if closed_at < lookback_start || closed_at > now {
            continue;
        }

        let own_links = (obs.bridge_id, BridgeId(0))..=(obs.bridge_id, BridgeId(u32::MAX));
        for ((trigger, target), group) in history.range(own_links) {
            let delays: Vec<f64> = group.iter().map(|link| link.delay_minutes).collect();
            let strengths: Vec<f64> = group.iter().map(|link| link.strength).collect();
            let delay = mean(&delays);
            let expected_at = closed_at + Duration::milliseconds((delay * 60_000.0).round() as i64);
            if expected_at < now || expected_at > horizon_end {
                continue;
            }

            let name_of = |id: &BridgeId| names.get(id).cloned().unwrap_or_else(|| id.to_string());
            alerts.push(CascadeAlert {
                trigger_bridge_id: *trigger,
                trigger_bridge_name: name_of(trigger),
                target_bridge_id: *target,
                target_bridge_name: name_of(target),
                triggered_at: closed_at,
                expected_at,
                probability: clamp_unit(mean(&strengths)),
                cascade_type: CascadeType::from_delay(delay),
            });
        }
    }

    alerts.sort_by(|a, b| {
        a.expected_at
            .cmp(&b.expected_at)
            .then(a.target_bridge_id.cmp(&b.target_bridge_id))
            .then(a.trigger_bridge_id.cmp(&b.trigger_bridge_id))
    });
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::TimeBucketAggregator;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn link(
        trigger: u32,
        target: u32,
        trigger_at: DateTime<Utc>,
        delay: f64,
        strength: f64,
    ) -> CascadeLink {
        CascadeLink {
            trigger_bridge_id: BridgeId(trigger),
            target_bridge_id: BridgeId(target),
            trigger_at,
            target_at: trigger_at + Duration::minutes(delay as i64),
            delay_minutes: delay,
            trigger_duration: 10.0,
            target_duration: 10.0,
            strength,
            cascade_type: CascadeType::from_delay(delay),
        }
    }

    #[test]
    fn test_profiles_pick_primary_target() {
        let opened = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        let observations = vec![
            Observation::closed(1, "Fremont", opened, 10.0),
            Observation::closed(1, "Fremont", opened + Duration::minutes(30), 10.0),
        ];
        let mut set = TimeBucketAggregator::default().aggregate(&observations);

        let closed = opened + Duration::minutes(10);
        let links = vec![
            link(1, 2, closed, 6.0, 0.8),
            link(1, 2, closed + Duration::minutes(30), 8.0, 0.6),
            link(1, 3, closed, 12.0, 0.9),
        ];
        apply_cascade_profiles(&mut set, &links, &SlotCalendar::utc());

        let bucket = set.iter().next().unwrap();
        let cascade = &bucket.cascade;
        assert_eq!(cascade.primary_cascade_target, Some(BridgeId(2)));
        assert_abs_diff_eq!(cascade.cascade_delay, 7.0);
        assert_abs_diff_eq!(cascade.cascade_probability, 1.0);
        // Three outgoing links against two openings saturate the frequency term
        assert_abs_diff_eq!(cascade.influence, (0.8 + 0.6 + 0.9) / 3.0, epsilon = 1e-12);
        assert_eq!(cascade.susceptibility, 0.0);
    }

    #[test]
    fn test_insights_describe_both_directions() {
        let at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 10, 0).unwrap();
        let links = vec![
            link(1, 2, at, 4.0, 0.9),
            link(1, 2, at, 6.0, 0.7),
            link(3, 1, at, 20.0, 0.5),
        ];
        let names: BTreeMap<BridgeId, String> = [
            (BridgeId(1), "Fremont".to_string()),
            (BridgeId(2), "Ballard".to_string()),
        ]
        .into_iter()
        .collect();

        let insights = insights_for(BridgeId(1), &links, &names);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].direction, CascadeDirection::Triggers);
        assert_eq!(insights[0].description, "triggers Ballard within 5 min");
        assert_eq!(insights[1].direction, CascadeDirection::TriggeredBy);
        assert_eq!(insights[1].related_bridge_name, "bridge-3");
    }

    #[test]
    fn test_alert_for_recent_trigger() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 15, 0).unwrap();
        // Fremont closed five minutes ago
        let recent = Observation::closed(1, "Fremont", now - Duration::minutes(15), 10.0);
        let history = vec![
            link(1, 2, now - Duration::days(7), 10.0, 0.8),
            link(1, 2, now - Duration::days(14), 12.0, 0.6),
            link(1, 3, now - Duration::days(7), 2.0, 0.9),
        ];

        let alerts = active_alerts(&[recent], &history, now, &CascadeConfig::default());
        assert_eq!(alerts.len(), 1);

        let alert = &alerts[0];
        assert_eq!(alert.target_bridge_id, BridgeId(2));
        assert_eq!(alert.expected_at, now + Duration::minutes(6));
        assert_abs_diff_eq!(alert.probability, 0.7, epsilon = 1e-12);
        assert_eq!(alert.cascade_type, CascadeType::ShortTerm);
    }

    #[test]
    fn test_no_alert_for_stale_trigger() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 15, 0).unwrap();
        let stale = Observation::closed(1, "Fremont", now - Duration::hours(2), 10.0);
        let history = vec![link(1, 2, now - Duration::days(7), 10.0, 0.8)];

        assert!(active_alerts(&[stale], &history, now, &CascadeConfig::default()).is_empty());
    }
}
