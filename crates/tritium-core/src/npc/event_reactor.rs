// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Delivers bus events to nearby brains, radius-filtered.

use crate::bus::Event;
use crate::model::{unit_type, Position, Target};
use crate::npc::NpcRegistry;

/// Default recall radius for events that don't carry their own (meters).
const DEFAULT_EVENT_RADIUS_M: f64 = 40.0;

/// Decay window applied to recorded memories, by event type.
fn decay_for(event_type: &str) -> f64 {
    match event_type {
        "target_eliminated" => 60.0,
        "shot_fired" | "beam_fired" => 15.0,
        "hazard_spawned" | "hazard_expired" => 120.0,
        _ => 30.0,
    }
}

/// Fan a batch of bus events out to every brain within recall radius of the
/// event's carried position (if any), recording them into memory.
pub fn distribute(events: &[Event], targets: &[Target], registry: &mut NpcRegistry, now: f64) {
    for event in events {
        let Some(origin) = event_position(event) else { continue };
        for target in targets {
            if target.status.is_terminal() {
                continue;
            }
            let radius = unit_type(target.asset_type).vision_radius.max(DEFAULT_EVENT_RADIUS_M);
            if target.position.distance(origin) > radius {
                continue;
            }
            if let Some(brain) = registry.get_mut(&target.target_id) {
                brain
                    .memory
                    .record(event.topic.clone(), event.data.clone(), now, decay_for(&event.topic));
            }
        }
    }
}

fn event_position(event: &Event) -> Option<Position> {
    let pos = event.data.get("position")?;
    let x = pos.get("x")?.as_f64()?;
    let y = pos.get("y")?.as_f64()?;
    Some(Position::new(x, y))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Alliance, AssetType};
    use crate::npc::Personality;

    #[test]
    fn event_within_radius_is_recorded_outside_is_not() {
        let mut registry = NpcRegistry::new();
        registry.attach("near", AssetType::Person);
        registry.attach("far", AssetType::Person);
        let near = {
            let mut t = Target::spawn("near", "Near", Alliance::Neutral, AssetType::Person, Position::new(1.0, 0.0), 0.0);
            t.position = Position::new(1.0, 0.0);
            t
        };
        let far = Target::spawn("far", "Far", Alliance::Neutral, AssetType::Person, Position::new(500.0, 0.0), 0.0);
        let events = vec![crate::bus::Event {
            topic: "target_eliminated".into(),
            data: serde_json::json!({"position": {"x": 0.0, "y": 0.0}}),
            ts_mono: 0,
        }];
        distribute(&events, &[near, far], &mut registry, 1.0);
        assert_eq!(registry.get("near").unwrap().memory.len(), 1);
        assert_eq!(registry.get("far").unwrap().memory.len(), 0);
        let _ = Personality::random();
    }
}
