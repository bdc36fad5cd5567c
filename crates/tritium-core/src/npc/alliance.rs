// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `AllianceManager::radicalize` — the only allowed neutral→hostile
//! transition.

use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::model::{Alliance, Position, Target};
use crate::npc::NpcBrain;

/// Global unrest level gating radicalization, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationLevel {
    Green,
    Amber,
    Red,
}

const ELIMINATION_COUNT_THRESHOLD: usize = 3;
const ELIMINATION_WINDOW_S: f64 = 60.0;
const SAFE_FRIENDLY_RADIUS_M: f64 = 30.0;
const AGGRESSION_THRESHOLD: f64 = 0.7;
const GLOBAL_COOLDOWN_S: f64 = 120.0;

/// Enforces the global cooldown between radicalization events.
pub struct AllianceManager {
    last_radicalization_t: f64,
}

impl Default for AllianceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AllianceManager {
    #[must_use]
    pub fn new() -> Self {
        Self { last_radicalization_t: f64::NEG_INFINITY }
    }

    /// Attempt to radicalize `brain`'s target, all five conditions required:
    /// ≥3 `target_eliminated` memories within 60s, global escalation ≥amber,
    /// no friendly within 30m, brain aggression > 0.7, global cooldown ≥120s
    /// since the last radicalization. Emits `npc_radicalized` on success.
    pub async fn radicalize(
        &mut self,
        brain: &NpcBrain,
        target: &mut Target,
        escalation: EscalationLevel,
        friendlies: &[&Target],
        now: f64,
        bus: &EventBus,
    ) -> bool {
        if target.alliance != Alliance::Neutral {
            return false;
        }
        if now - self.last_radicalization_t < GLOBAL_COOLDOWN_S {
            return false;
        }
        if escalation < EscalationLevel::Amber {
            return false;
        }
        if brain.personality.aggression <= AGGRESSION_THRESHOLD {
            return false;
        }
        let eliminations = brain.memory.count_recent("target_eliminated", now, ELIMINATION_WINDOW_S);
        if eliminations < ELIMINATION_COUNT_THRESHOLD {
            return false;
        }
        if has_nearby_friendly(target.position, friendlies) {
            return false;
        }

        target.alliance = Alliance::Hostile;
        self.last_radicalization_t = now;
        bus.publish(
            "npc_radicalized",
            serde_json::json!({ "target_id": target.target_id, "t": now }),
        )
        .await;
        true
    }
}

fn has_nearby_friendly(position: Position, friendlies: &[&Target]) -> bool {
    friendlies.iter().any(|f| f.position.distance(position) <= SAFE_FRIENDLY_RADIUS_M)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::AssetType;
    use crate::npc::{Memory, Personality};

    fn hot_brain() -> NpcBrain {
        let mut brain = NpcBrain::new("n1", Personality::new(0.5, 0.5, 0.5, 0.9));
        let mut mem = Memory::new();
        for t in [0.0, 10.0, 20.0] {
            mem.record("target_eliminated", serde_json::Value::Null, t, 300.0);
        }
        brain.memory = mem;
        brain
    }

    #[tokio::test]
    async fn radicalizes_when_all_five_conditions_hold() {
        let bus = EventBus::new();
        let mut mgr = AllianceManager::new();
        let brain = hot_brain();
        let mut target =
            Target::spawn("n1", "Neutral 1", Alliance::Neutral, AssetType::Person, Position::new(0.0, 0.0), 0.0);
        let ok = mgr.radicalize(&brain, &mut target, EscalationLevel::Amber, &[], 30.0, &bus).await;
        assert!(ok);
        assert_eq!(target.alliance, Alliance::Hostile);
    }

    #[tokio::test]
    async fn blocked_by_nearby_friendly() {
        let bus = EventBus::new();
        let mut mgr = AllianceManager::new();
        let brain = hot_brain();
        let mut target =
            Target::spawn("n1", "Neutral 1", Alliance::Neutral, AssetType::Person, Position::new(0.0, 0.0), 0.0);
        let friendly =
            Target::spawn("f1", "Friendly 1", Alliance::Friendly, AssetType::Person, Position::new(5.0, 0.0), 0.0);
        let ok = mgr.radicalize(&brain, &mut target, EscalationLevel::Amber, &[&friendly], 30.0, &bus).await;
        assert!(!ok);
        assert_eq!(target.alliance, Alliance::Neutral);
    }

    #[tokio::test]
    async fn global_cooldown_blocks_rapid_succession() {
        let bus = EventBus::new();
        let mut mgr = AllianceManager::new();
        let brain = hot_brain();
        let mut t1 =
            Target::spawn("n1", "Neutral 1", Alliance::Neutral, AssetType::Person, Position::new(0.0, 0.0), 0.0);
        assert!(mgr.radicalize(&brain, &mut t1, EscalationLevel::Red, &[], 30.0, &bus).await);
        let mut t2 =
            Target::spawn("n2", "Neutral 2", Alliance::Neutral, AssetType::Person, Position::new(0.0, 0.0), 0.0);
        assert!(!mgr.radicalize(&brain, &mut t2, EscalationLevel::Red, &[], 31.0, &bus).await);
    }
}
