// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Setup→Countdown→Active→Victory/Defeat FSM and wave spawning.

use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::difficulty::DifficultyScaler;
use crate::scenario::{Scenario, SpawnGroup, WaveDefinition};

/// Game FSM state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Setup,
    Countdown,
    Active,
    Victory,
    Defeat,
}

/// Countdown duration before a wave-based battle goes active.
pub const COUNTDOWN_S: f64 = 5.0;

/// A unit pending spawn, computed by the wave controller for the engine to
/// realize as a `Target`.
#[derive(Debug, Clone)]
pub struct PendingSpawn {
    pub group: SpawnGroup,
    pub elite: bool,
    pub health_bonus: f64,
    pub speed_bonus: f64,
}

/// Tracks FSM state and drives wave spawning.
pub struct GameMode {
    state: GameState,
    countdown_remaining: f64,
    scenario: Option<Scenario>,
    wave_index: usize,
    group_index: usize,
    spawned_in_group: u32,
    group_timer: f64,
    live_hostiles: u32,
    live_defenders: u32,
    escapes: u32,
    max_escapes: u32,
    difficulty: DifficultyScaler,
}

impl Default for GameMode {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: GameState::Setup,
            countdown_remaining: 0.0,
            scenario: None,
            wave_index: 0,
            group_index: 0,
            spawned_in_group: 0,
            group_timer: 0.0,
            live_hostiles: 0,
            live_defenders: 0,
            escapes: 0,
            max_escapes: 3,
            difficulty: DifficultyScaler::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> GameState {
        self.state
    }

    #[must_use]
    pub fn difficulty(&self) -> &DifficultyScaler {
        &self.difficulty
    }

    pub fn difficulty_mut(&mut self) -> &mut DifficultyScaler {
        &mut self.difficulty
    }

    /// `begin_war`: setup → countdown. No-op (returns `false`) outside setup.
    pub async fn begin_war(&mut self, scenario: Scenario, bus: &EventBus) -> bool {
        if self.state != GameState::Setup {
            return false;
        }
        self.max_escapes = scenario.max_hostiles.max(1);
        self.scenario = Some(scenario);
        self.state = GameState::Countdown;
        self.countdown_remaining = COUNTDOWN_S;
        bus.publish("game_state_changed", serde_json::json!({ "state": self.state })).await;
        true
    }

    /// `reset_game`: any state → setup, clearing hostiles/score.
    pub async fn reset_game(&mut self, bus: &EventBus) {
        self.state = GameState::Setup;
        self.scenario = None;
        self.wave_index = 0;
        self.group_index = 0;
        self.spawned_in_group = 0;
        self.group_timer = 0.0;
        self.live_hostiles = 0;
        self.escapes = 0;
        self.difficulty.reset();
        bus.publish("game_state_changed", serde_json::json!({ "state": self.state })).await;
    }

    /// Called by the engine when a hostile is eliminated, escapes, or
    /// despawns, to keep the live-hostile/escape counters accurate for the
    /// victory/defeat check.
    pub fn record_hostile_resolved(&mut self, escaped: bool) {
        self.live_hostiles = self.live_hostiles.saturating_sub(1);
        if escaped {
            self.escapes += 1;
        }
    }

    pub fn record_defender_eliminated(&mut self) {
        self.live_defenders = self.live_defenders.saturating_sub(1);
    }

    pub fn set_live_defenders(&mut self, count: u32) {
        self.live_defenders = count;
    }

    /// Advance the FSM by `dt` seconds. Returns any units that should spawn
    /// this tick.
    pub async fn tick(&mut self, dt: f64, bus: &EventBus) -> Vec<PendingSpawn> {
        match self.state {
            GameState::Countdown => {
                self.countdown_remaining -= dt;
                if self.countdown_remaining <= 0.0 {
                    self.state = GameState::Active;
                    bus.publish("game_state_changed", serde_json::json!({ "state": self.state })).await;
                }
                Vec::new()
            }
            GameState::Active => self.tick_active(dt, bus).await,
            GameState::Setup | GameState::Victory | GameState::Defeat => Vec::new(),
        }
    }

    async fn tick_active(&mut self, dt: f64, bus: &EventBus) -> Vec<PendingSpawn> {
        let spawns = self.advance_wave(dt);

        if self.live_defenders == 0 || self.escapes > self.max_escapes {
            self.state = GameState::Defeat;
            bus.publish("game_state_changed", serde_json::json!({ "state": self.state })).await;
            return spawns;
        }

        let waves_done = self
            .scenario
            .as_ref()
            .is_some_and(|s| self.wave_index >= s.waves.len());
        if waves_done && self.live_hostiles == 0 {
            self.state = GameState::Victory;
            bus.publish("game_state_changed", serde_json::json!({ "state": self.state })).await;
        }
        spawns
    }

    fn advance_wave(&mut self, dt: f64) -> Vec<PendingSpawn> {
        let Some(scenario) = self.scenario.clone() else { return Vec::new() };
        let Some(wave) = scenario.waves.get(self.wave_index).cloned() else {
            return Vec::new();
        };
        let Some(group) = wave.groups.get(self.group_index).cloned() else {
            self.wave_index += 1;
            self.group_index = 0;
            self.spawned_in_group = 0;
            self.group_timer = 0.0;
            return Vec::new();
        };

        self.group_timer += dt;
        let due_time = if self.spawned_in_group == 0 {
            group.delay
        } else {
            group.delay + f64::from(self.spawned_in_group) * group.spawn_interval.max(0.01)
        };

        let mut spawns = Vec::new();
        if self.group_timer >= due_time && self.spawned_in_group < effective_count(&group, &self.difficulty) {
            let adj = self.difficulty.wave_adjustments(group.count);
            let elite = adj.hardened && self.spawned_in_group == 0;
            spawns.push(PendingSpawn {
                group: group.clone(),
                elite,
                health_bonus: adj.hostile_health_bonus,
                speed_bonus: adj.hostile_speed_bonus,
            });
            self.spawned_in_group += 1;
            self.live_hostiles += 1;
        }

        if self.spawned_in_group >= effective_count(&group, &self.difficulty) {
            self.group_index += 1;
            self.spawned_in_group = 0;
            self.group_timer = 0.0;
        }

        spawns
    }
}

fn effective_count(group: &SpawnGroup, difficulty: &DifficultyScaler) -> u32 {
    difficulty.wave_adjustments(group.count).hostile_count
}
