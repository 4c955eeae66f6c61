//! Pairwise cascade detection between bridges
//!
//! The search is O(pairs × triggers × targets), so every dimension is capped
//! by [`CascadeConfig`]. Large inputs are first reduced to the most recent
//! observations of the busiest bridges.

use crate::calendar::SlotCalendar;
use crate::config::CascadeConfig;
use bridge_events::{BridgeId, Observation};
use bridge_math::clamp_unit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Delay class of a cascade link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CascadeType {
    /// Under 5 minutes
    Immediate,
    /// 5 to 15 minutes
    ShortTerm,
    /// 15 to 30 minutes
    MediumTerm,
    /// 30 minutes or more
    Delayed,
}

impl CascadeType {
    pub fn from_delay(delay_minutes: f64) -> Self {
        if delay_minutes < 5.0 {
            CascadeType::Immediate
        } else if delay_minutes < 15.0 {
            CascadeType::ShortTerm
        } else if delay_minutes < 30.0 {
            CascadeType::MediumTerm
        } else {
            CascadeType::Delayed
        }
    }
}

/// A trigger closing followed by a target opening
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeLink {
    pub trigger_bridge_id: BridgeId,
    pub target_bridge_id: BridgeId,
    /// When the trigger bridge closed
    pub trigger_at: DateTime<Utc>,
    /// When the target bridge opened
    pub target_at: DateTime<Utc>,
    /// Always positive
    pub delay_minutes: f64,
    pub trigger_duration: f64,
    pub target_duration: f64,
    pub strength: f64,
    #[serde(rename = "type")]
    pub cascade_type: CascadeType,
}

/// Finds scored temporal co-occurrences between bridge pairs
#[derive(Debug, Clone, Default)]
pub struct CascadeDetector {
    config: CascadeConfig,
    calendar: SlotCalendar,
}

impl CascadeDetector {
    pub fn new(config: CascadeConfig, calendar: SlotCalendar) -> Self {
        Self { config, calendar }
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Detect cascade links, ordered by trigger time
    pub fn detect(&self, observations: &[Observation]) -> Vec<CascadeLink> {
        let working = self.working_set(observations);
        let by_bridge = group_by_bridge(&working);
        if by_bridge.len() < 2 {
            return Vec::new();
        }

        let pairs = self.select_pairs(&by_bridge);
        let mut links = Vec::new();
        for (trigger_id, target_id) in pairs {
            let per_side = self.config.max_observations_per_side;
            let triggers = most_recent(&by_bridge[&trigger_id], per_side);
            let targets = most_recent(&by_bridge[&target_id], per_side);
            self.link_pair(triggers, targets, &mut links);
        }

        links.sort_by(|a, b| {
            a.trigger_at
                .cmp(&b.trigger_at)
                .then(a.trigger_bridge_id.cmp(&b.trigger_bridge_id))
                .then(a.target_bridge_id.cmp(&b.target_bridge_id))
                .then(a.target_at.cmp(&b.target_at))
        });

        debug!(
            observations = working.len(),
            bridges = by_bridge.len(),
            links = links.len(),
            "cascade detection finished"
        );
        links
    }

    /// Down-sample large inputs to recent activity on the busiest bridges
    fn working_set<'a>(&self, observations: &'a [Observation]) -> Vec<&'a Observation> {
        let mut working: Vec<&Observation> = observations.iter().collect();
        if working.len() <= self.config.large_dataset_threshold {
            return working;
        }

        working.sort_by(|a, b| b.open_at.cmp(&a.open_at).then(a.bridge_id.cmp(&b.bridge_id)));
        working.truncate(self.config.recent_observation_limit);

        let mut counts: HashMap<BridgeId, usize> = HashMap::new();
        for obs in &working {
            *counts.entry(obs.bridge_id).or_insert(0) += 1;
        }
        let mut ranked: Vec<(BridgeId, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.config.max_bridges);

        working.retain(|obs| ranked.iter().any(|(id, _)| *id == obs.bridge_id));
        warn!(
            total = observations.len(),
            kept = working.len(),
            bridges = ranked.len(),
            "cascade input down-sampled"
        );
        working
    }

    /// Ordered bridge pairs, busiest first
    fn select_pairs(
        &self,
        by_bridge: &BTreeMap<BridgeId, Vec<&Observation>>,
    ) -> Vec<(BridgeId, BridgeId)> {
        let mut pairs: Vec<(usize, BridgeId, BridgeId)> = Vec::new();
        for (trigger_id, triggers) in by_bridge {
            for (target_id, targets) in by_bridge {
                if trigger_id != target_id {
                    pairs.push((triggers.len() + targets.len(), *trigger_id, *target_id));
                }
            }
        }

        pairs.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
        if pairs.len() > self.config.max_bridge_pairs {
            debug!(
                candidates = pairs.len(),
                kept = self.config.max_bridge_pairs,
                "bridge pairs capped"
            );
            pairs.truncate(self.config.max_bridge_pairs);
        }

        pairs.into_iter().map(|(_, trigger, target)| (trigger, target)).collect()
    }

    fn link_pair(
        &self,
        triggers: &[&Observation],
        targets: &[&Observation],
        links: &mut Vec<CascadeLink>,
    ) {
        for trigger in triggers {
            let Some(closed_at) = trigger.close_at else {
                continue;
            };

            let mut candidates: Vec<(f64, &Observation)> = targets
                .iter()
                .map(|target| (minutes_between(closed_at, target.open_at), *target))
                .filter(|(delay, _)| *delay > 0.0 && *delay <= self.config.window_minutes)
                .collect();
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
            candidates.truncate(self.config.max_targets_per_trigger);

            for (delay, target) in candidates {
                let strength = self.strength(trigger, closed_at, target, delay);
                if strength >= self.config.min_strength {
                    links.push(CascadeLink {
                        trigger_bridge_id: trigger.bridge_id,
                        target_bridge_id: target.bridge_id,
                        trigger_at: closed_at,
                        target_at: target.open_at,
                        delay_minutes: delay,
                        trigger_duration: trigger.duration_minutes,
                        target_duration: target.duration_minutes,
                        strength,
                        cascade_type: CascadeType::from_delay(delay),
                    });
                }
            }
        }
    }

    /// 0.4 temporal + 0.3 duration similarity + 0.3 calendar consistency
    fn strength(
        &self,
        trigger: &Observation,
        closed_at: DateTime<Utc>,
        target: &Observation,
        delay: f64,
    ) -> f64 {
        let temporal = (1.0 - delay / self.config.window_minutes).max(0.0);

        let trigger_norm = clamp_unit(trigger.duration_minutes / 60.0);
        let target_norm = clamp_unit(target.duration_minutes / 60.0);
        let duration_correlation = 1.0 - (trigger_norm - target_norm).abs();

        let trigger_slot = self.calendar.slot(closed_at);
        let target_slot = self.calendar.slot(target.open_at);
        let same_weekday = if trigger_slot.day_of_week == target_slot.day_of_week {
            1.0
        } else {
            0.0
        };
        let raw_diff = trigger_slot.hour.abs_diff(target_slot.hour);
        let hour_diff = raw_diff.min(24 - raw_diff) as f64;
        let pattern_consistency = 0.5 * same_weekday + 0.5 * (1.0 - hour_diff / 2.0).max(0.0);

        clamp_unit(0.4 * temporal + 0.3 * duration_correlation + 0.3 * pattern_consistency)
    }
}

pub(crate) fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

fn group_by_bridge<'a>(
    observations: &[&'a Observation],
) -> BTreeMap<BridgeId, Vec<&'a Observation>> {
    let mut grouped: BTreeMap<BridgeId, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        grouped.entry(obs.bridge_id).or_default().push(*obs);
    }
    for list in grouped.values_mut() {
        list.sort_by(|a, b| a.open_at.cmp(&b.open_at));
    }
    grouped
}

/// Tail of an ascending list
fn most_recent<'a, 'b>(sorted: &'b [&'a Observation], limit: usize) -> &'b [&'a Observation] {
    &sorted[sorted.len().saturating_sub(limit)..]
}
