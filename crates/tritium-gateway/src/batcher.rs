// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Coalesces EventBus events arriving within a short window into one JSON
//! frame per flush, trading a few milliseconds of latency for far fewer WS
//! writes when the engine publishes several events the same tick (spec
//! §4.16).

use std::time::Duration;

use serde_json::Value;
use tritium_core::bus::Event;

/// Default coalescing window: one tick period, so a flush never spans more
/// than a single simulation step's worth of events.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

/// Buffers events and produces a single JSON array frame per flush.
#[derive(Debug, Default)]
pub struct TelemetryBatcher {
    pending: Vec<Value>,
}

impl TelemetryBatcher {
    #[must_use]
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Queue an event for the next flush.
    pub fn push(&mut self, event: &Event) {
        self.pending.push(serde_json::json!({
            "topic": event.topic,
            "data": event.data,
            "ts_mono": event.ts_mono,
        }));
    }

    /// True if there is nothing queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain the queue into one JSON array frame, or `None` if empty.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let batch = std::mem::take(&mut self.pending);
        serde_json::to_string(&batch).ok()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event(topic: &str, n: u64) -> Event {
        Event { topic: topic.to_string(), data: serde_json::json!({"n": n}), ts_mono: n }
    }

    #[test]
    fn flush_is_none_when_nothing_queued() {
        let mut batcher = TelemetryBatcher::new();
        assert!(batcher.flush().is_none());
    }

    #[test]
    fn flush_coalesces_all_queued_events_into_one_frame() {
        let mut batcher = TelemetryBatcher::new();
        batcher.push(&event("sim_state", 1));
        batcher.push(&event("sim_state", 2));
        let frame = batcher.flush().expect("frame");
        let parsed: Vec<Value> = serde_json::from_str(&frame).expect("json array");
        assert_eq!(parsed.len(), 2);
        assert!(batcher.is_empty());
    }
}
