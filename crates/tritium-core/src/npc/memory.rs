// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! A decaying ring-buffer memory of observed events, per brain.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One remembered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub event_type: String,
    pub data: Value,
    pub t_mono: f64,
    /// Seconds after which this memory is no longer recalled.
    pub decay: f64,
}

/// Bound on the number of retained events, independent of decay.
pub const CAPACITY: usize = 64;

/// A per-brain ring buffer of recent events.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    events: VecDeque<MemoryEvent>,
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event_type: impl Into<String>, data: Value, t_mono: f64, decay: f64) {
        if self.events.len() >= CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(MemoryEvent { event_type: event_type.into(), data, t_mono, decay });
    }

    /// Drop events whose decay window has elapsed as of `now`.
    pub fn prune(&mut self, now: f64) {
        self.events.retain(|e| now - e.t_mono < e.decay);
    }

    /// Count of events of `event_type` recorded within the last `window`
    /// seconds before `now` (used by `AllianceManager::radicalize`).
    #[must_use]
    pub fn count_recent(&self, event_type: &str, now: f64, window: f64) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type && now - e.t_mono <= window)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn prune_removes_events_past_decay_window() {
        let mut m = Memory::new();
        m.record("target_eliminated", Value::Null, 0.0, 10.0);
        m.prune(5.0);
        assert_eq!(m.len(), 1);
        m.prune(11.0);
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn count_recent_filters_by_type_and_window() {
        let mut m = Memory::new();
        m.record("target_eliminated", Value::Null, 0.0, 300.0);
        m.record("target_eliminated", Value::Null, 30.0, 300.0);
        m.record("shot_fired", Value::Null, 30.0, 300.0);
        assert_eq!(m.count_recent("target_eliminated", 50.0, 60.0), 2);
        assert_eq!(m.count_recent("target_eliminated", 400.0, 60.0), 0);
    }

    #[test]
    fn ring_buffer_drops_oldest_past_capacity() {
        let mut m = Memory::new();
        for i in 0..(CAPACITY + 5) {
            m.record("tick", Value::Null, i as f64, 1_000_000.0);
        }
        assert_eq!(m.len(), CAPACITY);
    }
}
