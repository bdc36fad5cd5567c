// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! TRITIUM-SC simulation and fusion engine.
//!
//! Owns the canonical target model, the fixed-cadence tick loop, the combat
//! and pathfinding subsystems, NPC intelligence, and the process-local event
//! bus that couples them. Protocol bridges and the HTTP/WS gateway are
//! separate crates that consume this one.

pub mod action_dsl;
pub mod bus;
pub mod combat;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod gamemode;
pub mod hazards;
pub mod model;
pub mod npc;
pub mod pathfind;
pub mod scenario;
pub mod sensors;
pub mod tracker;
pub mod weapons;

pub use bus::EventBus;
pub use engine::SimulationEngine;
pub use error::EngineError;
pub use model::Target;
pub use tracker::TargetTracker;
