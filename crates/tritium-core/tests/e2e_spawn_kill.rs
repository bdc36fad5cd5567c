// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Spawn-kill: a friendly turret in range of a lone hostile eventually emits
//! `shot_fired` then `target_eliminated`, and the turret's kill count
//! increments.

use std::time::Duration;

use tritium_core::engine::SimulationEngine;
use tritium_core::model::{Alliance, AssetType, Position, Status, Target};

#[tokio::test(start_paused = true)]
async fn turret_eliminates_a_lone_hostile_in_range() {
    let engine = SimulationEngine::new();

    let turret_id = engine
        .add_target(Target::spawn("turret-1", "Turret 1", Alliance::Friendly, AssetType::Turret, Position::new(0.0, 0.0), 0.0))
        .await;
    let hostile_id = engine.spawn_hostile(Some(Position::new(10.0, 0.0))).await;

    let (_sub, mut events) = engine.bus().subscribe().await.expect("bus open");
    engine.start();

    let mut saw_shot = false;
    let mut eliminated = false;
    for _ in 0..600 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(event) = events.try_recv() {
            match event.topic.as_str() {
                "shot_fired" => saw_shot = true,
                "target_eliminated" if event.data["target_id"] == hostile_id => eliminated = true,
                _ => {}
            }
        }
        if eliminated {
            break;
        }
    }

    assert!(saw_shot, "turret never fired on the hostile");
    assert!(eliminated, "hostile was never eliminated");

    let hostile = engine.get_target(&hostile_id).await.expect("hostile still tracked");
    assert_eq!(hostile.status, Status::Eliminated);
    let turret = engine.get_target(&turret_id).await.expect("turret still tracked");
    assert_eq!(turret.kills, 1);
}
