// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hazard reroute: a rover routed across a street graph avoids a hazard node
//! sitting on the direct path.

use tritium_core::hazards::{HazardManager, HazardType};
use tritium_core::model::{Alliance, AssetType, Position};
use tritium_core::pathfind::{Pathfinder, StreetGraph};

#[tokio::test]
async fn rover_route_excludes_the_hazard_node() {
    let mut graph = StreetGraph::new();
    graph.add_node(1, Position::new(-50.0, 0.0));
    graph.add_node(2, Position::new(0.0, 0.0));
    graph.add_node(3, Position::new(50.0, 0.0));
    graph.add_node(4, Position::new(0.0, 25.0));
    graph.add_edge(1, 2);
    graph.add_edge(2, 3);
    graph.add_edge(1, 4);
    graph.add_edge(4, 3);

    let mut hazards = HazardManager::new();
    let bus = tritium_core::bus::EventBus::new();
    hazards.spawn(HazardType::Roadblock, Position::new(0.0, 0.0), 10.0, 300.0, &bus).await;

    let blocked = hazards.blocked_nodes();
    let waypoints = Pathfinder::plan(
        Position::new(-50.0, 0.0),
        Position::new(50.0, 0.0),
        AssetType::Rover,
        Alliance::Friendly,
        Some(&graph),
        &[],
        &blocked,
    )
    .expect("a route exists around the hazard");

    assert!(
        waypoints.iter().all(|p| p.distance(Position::new(0.0, 0.0)) > 0.5),
        "route passes through the excluded hazard node: {waypoints:?}"
    );
}
