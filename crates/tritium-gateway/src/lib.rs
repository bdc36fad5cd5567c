// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Telemetry fan-out: ConnectionManager, TelemetryBatcher, and the axum
//! WebSocket/HTTP surface over a `tritium-core::engine::SimulationEngine`
//!, grounded in `echo-session-ws-gateway`.

pub mod batcher;
pub mod connection;
pub mod server;

pub use batcher::TelemetryBatcher;
pub use connection::ConnectionManager;
pub use server::{router, AppState};
