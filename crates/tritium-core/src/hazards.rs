// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dynamic blocking obstacles with a TTL, grounded in
//! `original_source/src/engine/simulation/hazards.py`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::model::Position;

/// The closed set of hazard kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardType {
    Roadblock,
    Fire,
    Flood,
}

const HAZARD_TYPES: [HazardType; 3] = [HazardType::Roadblock, HazardType::Fire, HazardType::Flood];

/// A single environmental hazard on the battlespace map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub id: String,
    pub hazard_type: HazardType,
    pub position: Position,
    pub radius: f64,
    pub duration: f64,
    pub active: bool,
    pub elapsed: f64,
}

/// Manages spawn/tick/expire of hazards and exposes blocked positions to the
/// pathfinder.
#[derive(Default)]
pub struct HazardManager {
    hazards: Vec<Hazard>,
    next_id: u64,
}

impl HazardManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("hazard-{}", self.next_id)
    }

    /// Create and register a new hazard, emitting `hazard_spawned`.
    pub async fn spawn(
        &mut self,
        hazard_type: HazardType,
        position: Position,
        radius: f64,
        duration: f64,
        bus: &EventBus,
    ) -> Hazard {
        let h = Hazard {
            id: self.fresh_id(),
            hazard_type,
            position,
            radius,
            duration,
            active: true,
            elapsed: 0.0,
        };
        bus.publish(
            "hazard_spawned",
            serde_json::json!({
                "id": h.id, "hazard_type": h.hazard_type, "position": h.position,
                "radius": h.radius, "duration": h.duration,
            }),
        )
        .await;
        self.hazards.push(h.clone());
        h
    }

    /// Spawn `count` hazards at random positions within `map_bounds`
    /// (half-extent), radius 5-15m, duration 20-60s.
    pub async fn spawn_random(&mut self, count: u32, map_bounds: f64, bus: &EventBus) -> Vec<Hazard> {
        let mut spawned = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (htype, pos, radius, duration) = {
                let mut rng = rand::thread_rng();
                let htype = HAZARD_TYPES[rng.gen_range(0..HAZARD_TYPES.len())];
                let pos = Position::new(
                    rng.gen_range(-map_bounds..=map_bounds),
                    rng.gen_range(-map_bounds..=map_bounds),
                );
                let radius = rng.gen_range(5.0..=15.0);
                let duration = rng.gen_range(20.0..=60.0);
                (htype, pos, radius, duration)
            };
            spawned.push(self.spawn(htype, pos, radius, duration, bus).await);
        }
        spawned
    }

    /// Advance timers and expire hazards past their duration.
    pub async fn tick(&mut self, dt: f64, bus: &EventBus) {
        let mut expired = Vec::new();
        for h in &mut self.hazards {
            if !h.active {
                continue;
            }
            h.elapsed += dt;
            if h.elapsed >= h.duration {
                h.active = false;
                expired.push(h.clone());
            }
        }
        self.hazards.retain(|h| h.active);
        for h in expired {
            bus.publish(
                "hazard_expired",
                serde_json::json!({ "id": h.id, "hazard_type": h.hazard_type, "position": h.position }),
            )
            .await;
        }
    }

    /// True if `position` lies inside any active hazard's disk.
    #[must_use]
    pub fn is_blocked(&self, position: Position) -> bool {
        self.hazards
            .iter()
            .any(|h| h.active && position.distance(h.position) <= h.radius)
    }

    /// Center positions of all active hazards, for the pathfinder's point
    /// exclusion list.
    #[must_use]
    pub fn blocked_nodes(&self) -> Vec<Position> {
        self.hazards.iter().filter(|h| h.active).map(|h| h.position).collect()
    }

    #[must_use]
    pub fn active_hazards(&self) -> Vec<&Hazard> {
        self.hazards.iter().filter(|h| h.active).collect()
    }

    /// Remove all hazards.
    pub fn clear(&mut self) {
        self.hazards.clear();
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hazard_expires_and_emits_event() {
        let bus = EventBus::new();
        let (_id, mut rx) = bus.subscribe().await.expect("open");
        let mut hm = HazardManager::new();
        hm.spawn(HazardType::Fire, Position::new(0.0, 0.0), 5.0, 1.0, &bus).await;
        let _spawned = rx.recv().await.expect("hazard_spawned");
        hm.tick(1.5, &bus).await;
        let expired = rx.recv().await.expect("hazard_expired");
        assert_eq!(expired.topic, "hazard_expired");
        assert!(hm.active_hazards().is_empty());
    }

    #[tokio::test]
    async fn is_blocked_checks_active_hazard_radius() {
        let bus = EventBus::new();
        let mut hm = HazardManager::new();
        hm.spawn(HazardType::Roadblock, Position::new(10.0, 10.0), 5.0, 60.0, &bus).await;
        assert!(hm.is_blocked(Position::new(12.0, 10.0)));
        assert!(!hm.is_blocked(Position::new(100.0, 100.0)));
    }
}
