// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The minimal HTTP+WS surface needed to exercise the engine end-to-end:
//! `/ws` streams batched EventBus telemetry, `/api/game/state` and
//! `/api/game/battle/{scenario}` are thin shells over
//! [`tritium_core::engine::SimulationEngine`]. Full REST routing and JSON
//! schemas are out of scope here.

use std::sync::Arc;

use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tritium_core::engine::SimulationEngine;
use tritium_core::scenario::ScenarioLoader;

use crate::connection::{self, ConnectionManager};

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub engine: SimulationEngine,
    pub connections: Arc<ConnectionManager>,
    pub scenarios: Arc<ScenarioLoader>,
    pub default_map_center: (f64, f64, f64),
}

/// Build the gateway's router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/game/state", get(game_state_handler))
        .route("/api/game/battle/:scenario", post(begin_battle_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let bus = state.engine.bus();
    let connections = state.connections.clone();
    ws.on_upgrade(move |socket| connection::serve(socket, bus, connections))
}

async fn game_state_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "game_state": format!("{:?}", state.engine.get_game_state().await),
        "targets": state.engine.get_targets().await.len(),
        "active_connections": state.connections.active_connections(),
    }))
}

async fn begin_battle_handler(State(state): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    match state.scenarios.load(&name, state.default_map_center) {
        Ok(scenario) => {
            let started = state.engine.begin_war(scenario).await;
            (StatusCode::OK, Json(json!({ "scenario": name, "started": started }))).into_response()
        }
        Err(err) => (StatusCode::NOT_FOUND, Json(json!({ "scenario": name, "error": err.to_string() }))).into_response(),
    }
}
