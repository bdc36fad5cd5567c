// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-connection WebSocket lifecycle: subscribe to the EventBus, batch
//! events through a [`TelemetryBatcher`], forward frames to the client, and
//! keep the link alive with a ping loop — grounded in
//! `echo-session-ws-gateway`'s writer-task / ping-loop / `select!` shutdown
//! pattern, generalized from a single Unix-socket upstream to the engine's
//! EventBus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};
use tritium_core::bus::EventBus;

use crate::batcher::{TelemetryBatcher, DEFAULT_WINDOW};

/// Tracks how many WebSocket clients are currently attached.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    active: AtomicU64,
    total: AtomicU64,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn on_connect(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    fn on_disconnect(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total_connections(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// Drive one WebSocket client for the lifetime of the connection: batches
/// and forwards EventBus events, pings every 15 s, exits on client
/// disconnect or bus shutdown.
pub async fn serve(socket: WebSocket, bus: Arc<EventBus>, manager: Arc<ConnectionManager>) {
    manager.on_connect();

    let Some((sub_id, mut events)) = bus.subscribe().await else {
        manager.on_disconnect();
        return;
    };

    let (mut sink, mut stream) = socket.split();
    let mut batcher = TelemetryBatcher::new();
    let mut flush_tick = tokio::time::interval(DEFAULT_WINDOW);
    let mut ping_tick = tokio::time::interval(Duration::from_secs(15));

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(error = %err, "gateway client read error");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Some(event) => batcher.push(&event),
                    None => break,
                }
            }
            _ = flush_tick.tick() => {
                if let Some(frame) = batcher.flush() {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
            }
            _ = ping_tick.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    bus.unsubscribe(sub_id).await;
    manager.on_disconnect();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn connection_counts_track_connect_and_disconnect() {
        let manager = ConnectionManager::new();
        manager.on_connect();
        manager.on_connect();
        assert_eq!(manager.active_connections(), 2);
        assert_eq!(manager.total_connections(), 2);
        manager.on_disconnect();
        assert_eq!(manager.active_connections(), 1);
        assert_eq!(manager.total_connections(), 2);
    }
}
