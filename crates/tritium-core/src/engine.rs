// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The tick-driven simulation engine: single authoritative writer of target
//! state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::bus::EventBus;
use crate::combat::{CombatSystem, Obstacle};
use crate::difficulty::WaveStats;
use crate::error::EngineError;
use crate::gamemode::{GameMode, GameState};
use crate::hazards::HazardManager;
use crate::model::{Alliance, AssetType, Position, Status, Target};
use crate::npc::fsm::{self, CivilianState, FsmInputs};
use crate::npc::routines::{PoiKind, PointOfInterest, RoutineLeg, RoutineScheduler, SimTimeOfDay};
use crate::npc::{AllianceManager, NpcRegistry};
use crate::pathfind::{Pathfinder, StreetGraph};
use crate::scenario::Scenario;
use crate::sensors::SensorSimulator;
use crate::tracker::TargetTracker;
use crate::weapons::WeaponSystem;

/// Target tick cadence.
pub const TICK_HZ: u64 = 10;
const TICK_PERIOD: Duration = Duration::from_millis(1000 / TICK_HZ);

struct EngineState {
    targets: HashMap<String, Target>,
    weapons: WeaponSystem,
    combat: CombatSystem,
    hazards: HazardManager,
    sensors: SensorSimulator,
    gamemode: GameMode,
    npc: NpcRegistry,
    alliance: AllianceManager,
    street_graph: Option<StreetGraph>,
    obstacles: Vec<Obstacle>,
    pois: Vec<PointOfInterest>,
    sim_time: f64,
    wave_start_t: f64,
    friendly_damage_taken: f64,
}

impl EngineState {
    fn new() -> Self {
        Self {
            targets: HashMap::new(),
            weapons: WeaponSystem::new(),
            combat: CombatSystem::new(),
            hazards: HazardManager::new(),
            sensors: SensorSimulator::new(),
            gamemode: GameMode::new(),
            npc: NpcRegistry::new(),
            alliance: AllianceManager::new(),
            street_graph: None,
            obstacles: Vec::new(),
            pois: Vec::new(),
            sim_time: 0.0,
            wave_start_t: 0.0,
            friendly_damage_taken: 0.0,
        }
    }
}

/// Single authoritative writer of simulation state, driven by a 10 Hz tick
/// loop. Cloning a `SimulationEngine` handle is cheap; all handles share the
/// same underlying state and bus.
#[derive(Clone)]
pub struct SimulationEngine {
    state: Arc<Mutex<EngineState>>,
    bus: Arc<EventBus>,
    next_id: Arc<AtomicU64>,
    running: Arc<std::sync::atomic::AtomicBool>,
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::new())),
            bus: Arc::new(EventBus::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            running: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Spawn the tick task. Cadence targets `TICK_HZ`; if a tick overruns its
    /// budget, the next scheduled tick is skipped rather than double-ticked
    /// (`MissedTickBehavior::Skip`).
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::Release);
        let engine = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(hz = TICK_HZ, "simulation engine tick loop starting");
            while engine.running.load(Ordering::Acquire) {
                interval.tick().await;
                let dt = TICK_PERIOD.as_secs_f64();
                engine.tick(dt).await;
            }
            info!("simulation engine tick loop stopped");
        })
    }

    /// Signal the tick loop to stop after its current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    async fn tick(&self, dt: f64) {
        let mut state = self.state.lock().await;
        state.sim_time += dt;
        let now = state.sim_time;

        for target in state.targets.values_mut() {
            target.tick(dt);
        }

        let mut targets = std::mem::take(&mut state.targets);
        state.weapons.tick(dt, &self.bus).await;
        state
            .combat
            .tick(dt, now, &mut targets, &mut state.weapons, &state.obstacles, &self.bus)
            .await;
        state.hazards.tick(dt, &self.bus).await;
        let target_vec: Vec<Target> = targets.values().cloned().collect();
        state.sensors.tick(now, &target_vec, &self.bus).await;
        state.targets = targets;

        self.reap_resolved(&mut state, now).await;
        self.run_npc_pass(&mut state, now).await;

        let spawns = state.gamemode.tick(dt, &self.bus).await;
        for spawn in spawns {
            self.realize_spawn(&mut state, &spawn).await;
        }

        self.publish_sim_state(&state).await;
    }

    async fn reap_resolved(&self, state: &mut EngineState, _now: f64) {
        let resolved: Vec<(String, bool, bool)> = state
            .targets
            .values()
            .filter(|t| t.status.is_terminal())
            .map(|t| (t.target_id.clone(), t.alliance == Alliance::Hostile, t.status == Status::Escaped))
            .collect();
        for (id, was_hostile, escaped) in resolved {
            if was_hostile {
                state.gamemode.record_hostile_resolved(escaped);
            } else if state.targets.get(&id).is_some_and(|t| t.alliance == Alliance::Friendly) {
                state.gamemode.record_defender_eliminated();
            }
            state.npc.detach(&id);
        }
    }

    async fn run_npc_pass(&self, state: &mut EngineState, now: f64) {
        let hostile_positions: Vec<Position> =
            state.targets.values().filter(|t| t.alliance == Alliance::Hostile && !t.status.is_terminal()).map(|t| t.position).collect();
        let friendlies: Vec<Target> =
            state.targets.values().filter(|t| t.alliance == Alliance::Friendly && !t.status.is_terminal()).cloned().collect();

        let mut due_for_routine: Vec<(String, RoutineLeg)> = Vec::new();
        for brain in state.npc.iter_mut() {
            brain.memory.prune(now);
            let Some(target) = state.targets.get(&brain.target_id) else { continue };
            if target.alliance == Alliance::Hostile {
                continue;
            }
            let nearest = hostile_positions
                .iter()
                .map(|p| target.position.distance(*p))
                .fold(f64::INFINITY, f64::min);
            let inputs = FsmInputs {
                hostile_visible: nearest.is_finite() && nearest <= target_vision(target),
                hostile_distance: nearest,
                recent_violence_events: fsm::violence_events_in_memory(&brain.memory, now),
            };
            brain.fsm_state = fsm::transition(brain.fsm_state, inputs, brain.personality);

            if brain.fsm_state == CivilianState::Wandering && target.waypoint_index >= target.waypoints.len() {
                let leg = RoutineScheduler::leg_for(SimTimeOfDay::from_sim_seconds(now), brain.personality);
                due_for_routine.push((brain.target_id.clone(), leg));
            }
        }
        self.route_civilian_routines(state, &due_for_routine);

        let escalation = crate::npc::alliance::EscalationLevel::Amber;
        let brain_ids: Vec<String> = state.npc.iter().map(|b| b.target_id.clone()).collect();
        for id in brain_ids {
            let is_neutral = state.targets.get(&id).is_some_and(|t| t.alliance == Alliance::Neutral);
            if !is_neutral {
                continue;
            }
            let Some(brain) = state.npc.get(&id).cloned() else { continue };
            if let Some(target) = state.targets.get_mut(&id) {
                let friendly_refs: Vec<&Target> = friendlies.iter().collect();
                state.alliance.radicalize(&brain, target, escalation, &friendly_refs, now, &self.bus).await;
            }
        }
    }

    /// Dispatch civilians whose waypoints ran out toward the nearest POI for
    /// their current routine leg. Brains with no matching POI in `state.pois`
    /// (e.g. a scenario with no zones) are left to wander in place.
    fn route_civilian_routines(&self, state: &mut EngineState, due: &[(String, RoutineLeg)]) {
        if state.pois.is_empty() {
            return;
        }
        for (target_id, leg) in due {
            let kind = match leg {
                RoutineLeg::Home => PoiKind::Home,
                RoutineLeg::Work => PoiKind::Work,
                RoutineLeg::Shop => PoiKind::Shop,
            };
            let Some((asset_type, alliance, start)) = state
                .targets
                .get(target_id)
                .map(|t| (t.asset_type, t.alliance, t.position))
            else {
                continue;
            };
            let Some(dest) = RoutineScheduler::nearest_poi(&state.pois, kind, start).map(|p| p.position) else { continue };
            let waypoints = Pathfinder::plan(
                start,
                dest,
                asset_type,
                alliance,
                state.street_graph.as_ref(),
                &state.obstacles,
                &state.hazards.blocked_nodes(),
            );
            if let Some(waypoints) = waypoints {
                if let Some(target) = state.targets.get_mut(target_id) {
                    target.waypoints = waypoints;
                    target.waypoint_index = 0;
                }
            }
        }
    }

    async fn realize_spawn(&self, state: &mut EngineState, spawn: &crate::gamemode::PendingSpawn) {
        for _ in 0..spawn.group.count {
            let id = self.fresh_id("hostile");
            let position = edge_position(spawn.group.edge, 150.0);
            let mut target =
                Target::spawn(id.clone(), format!("Hostile {id}"), Alliance::Hostile, spawn.group.asset_type, position, state.sim_time);
            target.max_health += spawn.health_bonus * target.max_health;
            target.health = target.max_health;
            target.speed += spawn.speed_bonus * target.speed;
            target.status = Status::Active;
            state.weapons.equip(&id, spawn.group.asset_type, true);
            state.npc.attach(&id, spawn.group.asset_type);
            self.bus
                .publish("hostile_spawned", serde_json::json!({ "target_id": id, "elite": spawn.elite }))
                .await;
            state.targets.insert(id, target);
        }
    }

    async fn publish_sim_state(&self, state: &EngineState) {
        let snapshot = serde_json::json!({
            "sim_time": state.sim_time,
            "game_state": state.gamemode.state(),
            "difficulty_multiplier": state.gamemode.difficulty().multiplier(),
            "target_count": state.targets.len(),
        });
        self.bus.publish("sim_state", snapshot).await;
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{n}")
    }

    // -- Public write-path API --

    pub async fn add_target(&self, mut target: Target) -> String {
        let mut state = self.state.lock().await;
        if target.target_id.is_empty() {
            target.target_id = self.fresh_id("target");
        }
        state.weapons.equip(&target.target_id, target.asset_type, target.alliance == Alliance::Hostile);
        state.npc.attach(&target.target_id, target.asset_type);
        let id = target.target_id.clone();
        state.targets.insert(id.clone(), target);
        drop(state);
        self.bus.publish("target_spawned", serde_json::json!({ "target_id": id })).await;
        id
    }

    pub async fn get_target(&self, id: &str) -> Option<Target> {
        self.state.lock().await.targets.get(id).cloned()
    }

    pub async fn get_targets(&self) -> Vec<Target> {
        self.state.lock().await.targets.values().cloned().collect()
    }

    /// Plan a route for `id` to `dest` and dispatch it. Errors if the unit is
    /// unknown, stationary (no path exists), or the route is rejected (e.g.
    /// a neutral-foot segment crossing a building).
    pub async fn dispatch_unit(&self, id: &str, dest: Position) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        let (asset_type, alliance, start) = {
            let t = state.targets.get(id).ok_or_else(|| EngineError::UnknownTarget(id.to_string()))?;
            (t.asset_type, t.alliance, t.position)
        };
        let waypoints = Pathfinder::plan(
            start,
            dest,
            asset_type,
            alliance,
            state.street_graph.as_ref(),
            &state.obstacles,
            &state.hazards.blocked_nodes(),
        )
        .ok_or_else(|| EngineError::InvalidRequest(format!("no route for {id}")))?;

        let t = state.targets.get_mut(id).ok_or_else(|| EngineError::UnknownTarget(id.to_string()))?;
        t.waypoints = waypoints;
        t.waypoint_index = 0;
        t.status = Status::Active;
        drop(state);
        self.bus.publish("unit_dispatched", serde_json::json!({ "target_id": id, "dest": dest })).await;
        Ok(())
    }

    /// Spawn a single hostile person, at `pos` if given or a default map
    /// edge otherwise.
    pub async fn spawn_hostile(&self, pos: Option<Position>) -> String {
        let mut state = self.state.lock().await;
        let position = pos.unwrap_or_else(|| edge_position(crate::scenario::MapEdge::North, 150.0));
        let id = self.fresh_id("hostile");
        let target = Target::spawn(id.clone(), format!("Hostile {id}"), Alliance::Hostile, AssetType::HostilePerson, position, state.sim_time);
        state.weapons.equip(&id, AssetType::HostilePerson, true);
        state.npc.attach(&id, AssetType::HostilePerson);
        state.targets.insert(id.clone(), target);
        drop(state);
        self.bus.publish("hostile_spawned", serde_json::json!({ "target_id": id, "elite": false })).await;
        id
    }

    /// Transition setup → countdown and begin wave spawning for `scenario`.
    pub async fn begin_war(&self, scenario: Scenario) -> bool {
        let mut state = self.state.lock().await;
        let t = state.sim_time;
        state.wave_start_t = t;
        state.pois = scenario.pois.clone();
        state.gamemode.begin_war(scenario, &self.bus).await
    }

    /// Reset all engine state back to `setup`, clearing targets and score.
    pub async fn reset_game(&self) {
        let mut state = self.state.lock().await;
        state.targets.clear();
        state.weapons.reset();
        state.combat.reset();
        state.hazards.clear();
        state.npc = NpcRegistry::new();
        state.pois.clear();
        state.friendly_damage_taken = 0.0;
        state.gamemode.reset_game(&self.bus).await;
    }

    pub async fn set_street_graph(&self, graph: StreetGraph) {
        self.state.lock().await.street_graph = Some(graph);
    }

    pub async fn set_obstacles(&self, obstacles: Vec<Obstacle>) {
        self.state.lock().await.obstacles = obstacles;
    }

    pub async fn get_game_state(&self) -> GameState {
        self.state.lock().await.gamemode.state()
    }

    /// Record the current wave's outcome with the difficulty scaler. Callers
    /// (typically the gamemode transition on wave completion) supply the raw
    /// performance inputs; kept as a manual hook rather than automatic
    /// per-wave bookkeeping to let scenario authors define "wave complete".
    pub async fn record_wave_outcome(&self, stats: WaveStats) {
        let mut state = self.state.lock().await;
        state.gamemode.difficulty_mut().record_wave(stats);
    }

    /// Snapshot the target tracker's view by feeding every current engine
    /// target through `update_from_simulation`.
    pub async fn sync_tracker(&self, tracker: &mut TargetTracker) {
        let state = self.state.lock().await;
        for target in state.targets.values() {
            tracker.update_from_simulation(target.clone());
        }
    }

    /// Report damage taken by a friendly unit toward the active wave's
    /// difficulty bookkeeping.
    pub async fn note_friendly_damage(&self, amount: f64) {
        self.state.lock().await.friendly_damage_taken += amount;
    }
}

fn target_vision(target: &Target) -> f64 {
    crate::model::unit_type(target.asset_type).vision_radius
}

fn edge_position(edge: crate::scenario::MapEdge, half_extent: f64) -> Position {
    use crate::scenario::MapEdge;
    match edge {
        MapEdge::North => Position::new(0.0, half_extent),
        MapEdge::South => Position::new(0.0, -half_extent),
        MapEdge::East => Position::new(half_extent, 0.0),
        MapEdge::West => Position::new(-half_extent, 0.0),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::AssetType;

    #[tokio::test]
    async fn add_and_get_target_round_trips() {
        let engine = SimulationEngine::new();
        let id = engine
            .add_target(Target::spawn("", "Turret 1", Alliance::Friendly, AssetType::Turret, Position::new(0.0, 0.0), 0.0))
            .await;
        let fetched = engine.get_target(&id).await.expect("target present");
        assert_eq!(fetched.asset_type, AssetType::Turret);
    }

    #[tokio::test]
    async fn dispatch_unknown_target_is_invalid_request() {
        let engine = SimulationEngine::new();
        let err = engine.dispatch_unit("nope", Position::new(1.0, 1.0)).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownTarget(_)));
    }

    #[tokio::test]
    async fn tick_advances_sim_time_and_publishes_state() {
        let engine = SimulationEngine::new();
        let (_id, mut rx) = engine.bus().subscribe().await.expect("open");
        engine.tick(0.1).await;
        let ev = rx.recv().await.expect("sim_state");
        assert_eq!(ev.topic, "sim_state");
    }

    #[tokio::test]
    async fn reset_clears_targets() {
        let engine = SimulationEngine::new();
        engine
            .add_target(Target::spawn("", "Turret 1", Alliance::Friendly, AssetType::Turret, Position::new(0.0, 0.0), 0.0))
            .await;
        engine.reset_game().await;
        assert!(engine.get_targets().await.is_empty());
    }

    fn scenario_with_home_zone() -> Scenario {
        use crate::scenario::{Zone, ZoneShape};
        Scenario {
            name: "routine-test".into(),
            map_bounds: 500.0,
            max_hostiles: 10,
            defenders: Vec::new(),
            waves: Vec::new(),
            map_center: None,
            zones: vec![Zone {
                name: "Home Block".into(),
                zone_type: "residential".into(),
                center: Position::new(200.0, 0.0),
                shape: ZoneShape::Circle { radius: 20.0 },
                events: Vec::new(),
            }],
            pois: Vec::new(),
        }
    }

    #[tokio::test]
    async fn idle_civilian_routes_toward_home_poi() {
        let engine = SimulationEngine::new();
        let mut scenario = scenario_with_home_zone();
        scenario.pois = crate::scenario::pois_from_zones(&scenario.zones);
        engine.begin_war(scenario).await;

        let id = engine
            .add_target(Target::spawn("civ-1", "Civilian", Alliance::Neutral, AssetType::Person, Position::new(0.0, 0.0), 0.0))
            .await;
        engine.tick(0.1).await;

        let target = engine.get_target(&id).await.expect("target present");
        assert!(!target.waypoints.is_empty(), "civilian should have been routed toward a poi");
    }
}
