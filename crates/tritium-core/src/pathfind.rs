// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unit-type-aware route planning over a street graph and building obstacles.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::combat::{segment_crosses_building, Obstacle};
use crate::model::{Alliance, AssetType, Category, Position};

/// A node in the street graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: u64,
    pub position: Position,
}

/// An undirected street graph: nodes plus adjacency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreetGraph {
    pub nodes: HashMap<u64, GraphNode>,
    pub edges: HashMap<u64, Vec<u64>>,
}

impl StreetGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: u64, position: Position) {
        self.nodes.insert(id, GraphNode { id, position });
        self.edges.entry(id).or_default();
    }

    pub fn add_edge(&mut self, a: u64, b: u64) {
        self.edges.entry(a).or_default().push(b);
        self.edges.entry(b).or_default().push(a);
    }

    /// Nearest node to `pos` within `max_dist`, ties broken by lower node id.
    #[must_use]
    pub fn nearest_node(&self, pos: Position, max_dist: f64) -> Option<u64> {
        let mut best: Option<(u64, f64)> = None;
        let mut ids: Vec<&u64> = self.nodes.keys().collect();
        ids.sort_unstable();
        for id in ids {
            let n = &self.nodes[id];
            let d = n.position.distance(pos);
            if d > max_dist {
                continue;
            }
            match best {
                Some((_, bd)) if bd <= d => {}
                _ => best = Some((*id, d)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// A* shortest path between two nodes, Euclidean-distance edge costs and
    /// straight-line heuristic, ties broken by lower node id.
    #[must_use]
    pub fn astar(&self, start: u64, goal: u64) -> Option<Vec<u64>> {
        if start == goal {
            return Some(vec![start]);
        }
        if !self.nodes.contains_key(&start) || !self.nodes.contains_key(&goal) {
            return None;
        }

        #[derive(PartialEq)]
        struct Item {
            cost: f64,
            node: u64,
        }
        impl Eq for Item {}
        impl Ord for Item {
            fn cmp(&self, other: &Self) -> Ordering {
                // Min-heap via reversed partial_cmp; tie-break on lower node id.
                other
                    .cost
                    .partial_cmp(&self.cost)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| other.node.cmp(&self.node))
            }
        }
        impl PartialOrd for Item {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let goal_pos = self.nodes[&goal].position;
        let mut open = BinaryHeap::new();
        let mut g_score: HashMap<u64, f64> = HashMap::new();
        let mut came_from: HashMap<u64, u64> = HashMap::new();

        g_score.insert(start, 0.0);
        open.push(Item { cost: self.nodes[&start].position.distance(goal_pos), node: start });

        while let Some(Item { node, .. }) = open.pop() {
            if node == goal {
                return Some(reconstruct(&came_from, goal, start));
            }
            let mut neighbors = self.edges.get(&node).cloned().unwrap_or_default();
            neighbors.sort_unstable();
            let current_g = g_score.get(&node).copied().unwrap_or(f64::INFINITY);
            for next in neighbors {
                let Some(next_node) = self.nodes.get(&next) else { continue };
                let step = self.nodes[&node].position.distance(next_node.position);
                let tentative = current_g + step;
                if tentative < g_score.get(&next).copied().unwrap_or(f64::INFINITY) {
                    came_from.insert(next, node);
                    g_score.insert(next, tentative);
                    let f = tentative + next_node.position.distance(goal_pos);
                    open.push(Item { cost: f, node: next });
                }
            }
        }
        None
    }
}

fn reconstruct(came_from: &HashMap<u64, u64>, goal: u64, start: u64) -> Vec<u64> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(prev) => {
                path.push(*prev);
                current = *prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Distance within which `hostile foot` units give up graph-following and
/// head straight for the destination.
pub const HOSTILE_FOOT_DIRECT_THRESHOLD_M: f64 = 30.0;

/// Snap tolerance for ground vehicles joining the street graph.
pub const GRAPH_SNAP_TOLERANCE_M: f64 = 5.0;

/// Plans routes according to the unit-type routing policy.
pub struct Pathfinder;

impl Pathfinder {
    /// Compute a waypoint list from `start` to `end` for `asset_type`,
    /// `alliance` (only used to distinguish hostile vs. neutral foot policy),
    /// optionally following `graph`, and avoiding `obstacles`/`blocked`
    /// exclusion points from the hazard manager.
    #[must_use]
    pub fn plan(
        start: Position,
        end: Position,
        asset_type: AssetType,
        alliance: Alliance,
        graph: Option<&StreetGraph>,
        obstacles: &[Obstacle],
        blocked: &[Position],
    ) -> Option<Vec<Position>> {
        let entry = crate::model::unit_type(asset_type);
        match entry.category {
            Category::Stationary => None,
            Category::Air => Some(vec![start, end]),
            Category::Ground => Self::plan_ground(start, end, graph, blocked),
            Category::Foot => {
                if alliance == Alliance::Hostile {
                    Self::plan_hostile_foot(start, end, graph, blocked)
                } else {
                    Self::plan_neutral_foot(start, end, obstacles)
                }
            }
        }
    }

    fn plan_ground(
        start: Position,
        end: Position,
        graph: Option<&StreetGraph>,
        blocked: &[Position],
    ) -> Option<Vec<Position>> {
        let Some(graph) = graph else {
            return Some(vec![start, end]);
        };
        let graph = exclude_blocked(graph, blocked);
        let start_node = graph.nearest_node(start, GRAPH_SNAP_TOLERANCE_M);
        let end_node = graph.nearest_node(end, GRAPH_SNAP_TOLERANCE_M);
        let (Some(sn), Some(en)) = (start_node, end_node) else {
            return Some(vec![start, end]);
        };
        let path = graph.astar(sn, en)?;
        let mut waypoints: Vec<Position> = Vec::with_capacity(path.len() + 2);
        let snap_start = graph.nodes[&sn].position;
        if snap_start.distance(start) > f64::EPSILON {
            waypoints.push(start);
        }
        waypoints.extend(path.iter().map(|id| graph.nodes[id].position));
        let snap_end = graph.nodes[&en].position;
        if snap_end.distance(end) > f64::EPSILON {
            waypoints.push(end);
        }
        Some(waypoints)
    }

    fn plan_hostile_foot(
        start: Position,
        end: Position,
        graph: Option<&StreetGraph>,
        blocked: &[Position],
    ) -> Option<Vec<Position>> {
        if start.distance(end) <= HOSTILE_FOOT_DIRECT_THRESHOLD_M {
            return Some(vec![start, end]);
        }
        let Some(graph) = graph else {
            return Some(vec![start, end]);
        };
        let graph = exclude_blocked(graph, blocked);
        let start_node = graph.nearest_node(start, GRAPH_SNAP_TOLERANCE_M * 2.0);
        if let Some(sn) = start_node {
            // Graph-follow until within the direct threshold of `end`, then a direct segment.
            let mut nearby_to_end: Vec<(u64, f64)> = graph
                .nodes
                .values()
                .map(|n| (n.id, n.position.distance(end)))
                .filter(|(_, d)| *d <= HOSTILE_FOOT_DIRECT_THRESHOLD_M)
                .collect();
            nearby_to_end.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
            if let Some((en, _)) = nearby_to_end.into_iter().next() {
                if let Some(path) = graph.astar(sn, en) {
                    let mut waypoints: Vec<Position> =
                        path.iter().map(|id| graph.nodes[id].position).collect();
                    waypoints.push(end);
                    return Some(waypoints);
                }
            }
        }
        Some(vec![start, end])
    }

    fn plan_neutral_foot(start: Position, end: Position, obstacles: &[Obstacle]) -> Option<Vec<Position>> {
        if segment_crosses_building(start, end, obstacles) {
            return None;
        }
        Some(vec![start, end])
    }
}

fn exclude_blocked(graph: &StreetGraph, blocked: &[Position]) -> StreetGraph {
    if blocked.is_empty() {
        return graph.clone();
    }
    let mut g = graph.clone();
    let blocked_ids: Vec<u64> = g
        .nodes
        .values()
        .filter(|n| blocked.iter().any(|b| b.distance(n.position) <= 0.5))
        .map(|n| n.id)
        .collect();
    for id in blocked_ids {
        g.nodes.remove(&id);
        g.edges.remove(&id);
        for neighbors in g.edges.values_mut() {
            neighbors.retain(|n| *n != id);
        }
    }
    g
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn air_units_go_direct_ignoring_graph() {
        let mut g = StreetGraph::new();
        g.add_node(1, Position::new(0.0, 0.0));
        let path = Pathfinder::plan(
            Position::new(0.0, 0.0),
            Position::new(100.0, 100.0),
            AssetType::Drone,
            Alliance::Friendly,
            Some(&g),
            &[],
            &[],
        );
        assert_eq!(path, Some(vec![Position::new(0.0, 0.0), Position::new(100.0, 100.0)]));
    }

    #[test]
    fn stationary_returns_none() {
        let path = Pathfinder::plan(
            Position::new(0.0, 0.0),
            Position::new(10.0, 10.0),
            AssetType::Turret,
            Alliance::Friendly,
            None,
            &[],
            &[],
        );
        assert!(path.is_none());
    }

    #[test]
    fn hazard_reroute_excludes_blocked_node() {
        let mut g = StreetGraph::new();
        g.add_node(1, Position::new(-50.0, 0.0));
        g.add_node(2, Position::new(0.0, 0.0));
        g.add_node(3, Position::new(50.0, 0.0));
        g.add_edge(1, 2);
        g.add_edge(2, 3);

        let path = Pathfinder::plan(
            Position::new(-50.0, 0.0),
            Position::new(50.0, 0.0),
            AssetType::Rover,
            Alliance::Friendly,
            Some(&g),
            &[],
            &[Position::new(0.0, 0.0)],
        )
        .expect("some path exists without the hazard node");
        assert!(!path.iter().any(|p| p.distance(Position::new(0.0, 0.0)) < 10.0));
    }

    #[test]
    fn neutral_foot_rejects_segment_crossing_building() {
        let building = Obstacle {
            polygon: vec![
                Position::new(-5.0, -5.0),
                Position::new(5.0, -5.0),
                Position::new(5.0, 5.0),
                Position::new(-5.0, 5.0),
            ],
        };
        let path = Pathfinder::plan(
            Position::new(-10.0, 0.0),
            Position::new(10.0, 0.0),
            AssetType::Person,
            Alliance::Neutral,
            None,
            &[building],
            &[],
        );
        assert!(path.is_none());
    }

    #[test]
    fn astar_tie_breaks_on_lower_node_id() {
        let mut g = StreetGraph::new();
        g.add_node(1, Position::new(0.0, 0.0));
        g.add_node(2, Position::new(1.0, 0.0));
        g.add_node(3, Position::new(1.0, 0.0));
        g.add_node(4, Position::new(2.0, 0.0));
        g.add_edge(1, 2);
        g.add_edge(1, 3);
        g.add_edge(2, 4);
        g.add_edge(3, 4);
        let path = g.astar(1, 4).expect("path");
        assert_eq!(path, vec![1, 2, 4]);
    }
}
