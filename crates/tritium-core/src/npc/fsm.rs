// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Civilian pedestrian FSM: `wandering → observing → fleeing → hiding`.
//! Transitions fire from memory/event thresholds and line-of-sight to
//! hostiles; factories exist per asset type.

use serde::{Deserialize, Serialize};

use crate::npc::{Memory, Personality};

/// FSM states for civilian-class brains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivilianState {
    Wandering,
    Observing,
    Fleeing,
    Hiding,
}

/// Inputs the FSM needs to decide a transition for one tick.
#[derive(Debug, Clone, Copy)]
pub struct FsmInputs {
    pub hostile_visible: bool,
    pub hostile_distance: f64,
    pub recent_violence_events: usize,
}

/// Distance inside which a visible hostile is alarming enough to flee.
const FLEE_DISTANCE_M: f64 = 20.0;
/// Distance inside which a fleeing civilian goes to ground instead.
const HIDE_DISTANCE_M: f64 = 8.0;

/// Advance `state` given `inputs` and the brain's caution trait. Pure
/// function so factories per asset type can wrap it with extra guards.
#[must_use]
pub fn transition(state: CivilianState, inputs: FsmInputs, personality: Personality) -> CivilianState {
    match state {
        CivilianState::Wandering => {
            if inputs.hostile_visible {
                CivilianState::Observing
            } else {
                state
            }
        }
        CivilianState::Observing => {
            if !inputs.hostile_visible {
                CivilianState::Wandering
            } else if inputs.hostile_distance <= FLEE_DISTANCE_M || inputs.recent_violence_events >= 1 {
                CivilianState::Fleeing
            } else {
                state
            }
        }
        CivilianState::Fleeing => {
            if inputs.hostile_distance <= HIDE_DISTANCE_M * (1.0 + personality.caution) {
                CivilianState::Hiding
            } else if !inputs.hostile_visible && inputs.recent_violence_events == 0 {
                CivilianState::Wandering
            } else {
                state
            }
        }
        CivilianState::Hiding => {
            if !inputs.hostile_visible && inputs.hostile_distance > FLEE_DISTANCE_M {
                CivilianState::Wandering
            } else {
                state
            }
        }
    }
}

/// Default factory: every brain-bearing asset type starts `wandering`.
/// Hostile-aligned units (combatants) never run the civilian FSM; callers
/// should check alliance/combat status before invoking `transition`.
#[must_use]
pub const fn initial_state() -> CivilianState {
    CivilianState::Wandering
}

#[must_use]
pub fn violence_events_in_memory(memory: &Memory, now: f64) -> usize {
    memory.count_recent("target_eliminated", now, 30.0) + memory.count_recent("shot_fired", now, 15.0)
}
