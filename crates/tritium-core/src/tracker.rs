// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unifies engine targets with externally-sourced records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Alliance, Target};

/// Source prefix applied to ids derived from TAK/CoT peers.
pub const TAK_PREFIX: &str = "tak_";
/// Source prefix applied to ids derived from MQTT robots and Meshtastic
/// nodes (mesh-derived nodes share ID-space with MQTT for simplicity).
pub const MQTT_PREFIX: &str = "mqtt_";

/// A detection-sourced record: vision/YOLO derived, with confidence and
/// last-seen bookkeeping instead of full simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub target: Target,
    pub confidence: f64,
    pub last_seen_mono: f64,
}

/// A small read model summarizing tracker contents for telemetry/UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSummary {
    pub total: usize,
    pub hostiles: usize,
    pub friendlies: usize,
    pub neutrals: usize,
    pub external: usize,
}

/// The union of engine-owned targets and externally-sourced records,
/// indexed by (possibly source-prefixed) target id.
#[derive(Default)]
pub struct TargetTracker {
    targets: HashMap<String, Target>,
}

impl TargetTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent upsert from the simulation engine's own tick (no source
    /// prefix — internal ids are authoritative).
    pub fn update_from_simulation(&mut self, target: Target) {
        self.targets.insert(target.target_id.clone(), target);
    }

    /// Upsert a detection-derived record (vision/YOLO); `source_prefix`
    /// must be one of [`TAK_PREFIX`]/[`MQTT_PREFIX`] and is prepended to
    /// `target.target_id` unless already present.
    pub fn update_from_detection(&mut self, mut target: Target, source_prefix: &str) {
        if !target.target_id.starts_with(source_prefix) {
            target.target_id = format!("{source_prefix}{}", target.target_id);
        }
        self.targets.insert(target.target_id.clone(), target);
    }

    #[must_use]
    pub fn get_target(&self, id: &str) -> Option<&Target> {
        self.targets.get(id)
    }

    #[must_use]
    pub fn get_all(&self) -> Vec<&Target> {
        self.targets.values().collect()
    }

    #[must_use]
    pub fn get_hostiles(&self) -> Vec<&Target> {
        self.targets.values().filter(|t| t.alliance == Alliance::Hostile).collect()
    }

    #[must_use]
    pub fn get_friendlies(&self) -> Vec<&Target> {
        self.targets.values().filter(|t| t.alliance == Alliance::Friendly).collect()
    }

    /// True if `id` was derived from the bridge identified by
    /// `source_prefix` — bridges use this to prevent re-publishing a
    /// target they themselves fed into the tracker (loopback prevention).
    #[must_use]
    pub fn is_from_source(id: &str, source_prefix: &str) -> bool {
        id.starts_with(source_prefix)
    }

    pub fn remove(&mut self, id: &str) -> Option<Target> {
        self.targets.remove(id)
    }

    #[must_use]
    pub fn summary(&self) -> TrackerSummary {
        let mut s = TrackerSummary { total: 0, hostiles: 0, friendlies: 0, neutrals: 0, external: 0 };
        for (id, t) in &self.targets {
            s.total += 1;
            match t.alliance {
                Alliance::Hostile => s.hostiles += 1,
                Alliance::Friendly => s.friendlies += 1,
                Alliance::Neutral | Alliance::Unknown => s.neutrals += 1,
            }
            if id.starts_with(TAK_PREFIX) || id.starts_with(MQTT_PREFIX) {
                s.external += 1;
            }
        }
        s
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{AssetType, Position};

    fn sample(id: &str, alliance: Alliance) -> Target {
        Target::spawn(id, id, alliance, AssetType::Person, Position::new(0.0, 0.0), 0.0)
    }

    #[test]
    fn update_from_simulation_is_idempotent_upsert() {
        let mut tracker = TargetTracker::new();
        tracker.update_from_simulation(sample("t1", Alliance::Friendly));
        tracker.update_from_simulation(sample("t1", Alliance::Friendly));
        assert_eq!(tracker.get_all().len(), 1);
    }

    #[test]
    fn external_ids_get_source_prefix() {
        let mut tracker = TargetTracker::new();
        tracker.update_from_detection(sample("alpha", Alliance::Hostile), TAK_PREFIX);
        assert!(tracker.get_target("tak_alpha").is_some());
        assert!(tracker.get_target("alpha").is_none());
    }

    #[test]
    fn summary_counts_by_alliance_and_source() {
        let mut tracker = TargetTracker::new();
        tracker.update_from_simulation(sample("f1", Alliance::Friendly));
        tracker.update_from_detection(sample("h1", Alliance::Hostile), TAK_PREFIX);
        let summary = tracker.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.friendlies, 1);
        assert_eq!(summary.hostiles, 1);
        assert_eq!(summary.external, 1);
    }
}
