// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rate-limited LLM-backed brain thinking with a behavior-tree fallback.
//! LLM calls are out-of-band and non-blocking to the tick thread: `poll`
//! only ever decides *who* may think this tick and hands back a budget;
//! the actual call happens on a dedicated worker.

use rand::Rng;

use crate::npc::{NpcBrain, Personality};

/// Sustained rate of the global think-token bucket.
pub const TOKENS_PER_SECOND: f64 = 1.0;
/// Maximum burst capacity of the bucket.
pub const BURST_CAPACITY: f64 = 3.0;

/// A global token bucket gating how many brains may invoke the LLM per
/// tick, prioritized by recent stimuli / aggression / player-facing.
pub struct LLMThinkScheduler {
    tokens: f64,
}

impl Default for LLMThinkScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl LLMThinkScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self { tokens: BURST_CAPACITY }
    }

    fn refill(&mut self, dt: f64) {
        self.tokens = (self.tokens + TOKENS_PER_SECOND * dt).min(BURST_CAPACITY);
    }

    /// Select up to the available token budget worth of brains to think
    /// this tick, ranked by priority (recent stimuli > aggression).
    pub fn select<'a>(&mut self, dt: f64, brains: impl Iterator<Item = &'a NpcBrain>, now: f64) -> Vec<String> {
        self.refill(dt);
        let mut ranked: Vec<(&NpcBrain, f64)> = brains
            .map(|b| {
                let stimulus = b.memory.len() as f64;
                let priority = stimulus * 2.0 + b.personality.aggression;
                (b, priority)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut chosen = Vec::new();
        for (brain, _) in ranked {
            if self.tokens < 1.0 {
                break;
            }
            if now - brain.last_think_t < 1.0 {
                continue;
            }
            self.tokens -= 1.0;
            chosen.push(brain.target_id.clone());
        }
        chosen
    }
}

/// A single brain action, as emitted by either the LLM path or the
/// fallback (§4.13 Action DSL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackAction {
    Wander,
    Observe,
    Flee,
    Say(&'static str),
}

/// Weighted-random, personality-biased action choice used whenever the
/// LLM call fails or times out.
pub struct BehaviorTreeFallback;

impl BehaviorTreeFallback {
    #[must_use]
    pub fn choose(personality: Personality) -> FallbackAction {
        let weights = [
            (FallbackAction::Wander, 1.0 - personality.curiosity * 0.5),
            (FallbackAction::Observe, personality.curiosity),
            (FallbackAction::Flee, personality.caution * 0.5),
            (FallbackAction::Say("..."), personality.sociability * 0.3),
        ];
        let total: f64 = weights.iter().map(|(_, w)| w.max(0.01)).sum();
        let mut roll = rand::thread_rng().gen_range(0.0..total);
        for (action, weight) in weights {
            let w = weight.max(0.01);
            if roll < w {
                return action;
            }
            roll -= w;
        }
        FallbackAction::Wander
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::npc::NpcBrain;

    #[test]
    fn bucket_never_exceeds_burst_capacity() {
        let mut sched = LLMThinkScheduler::new();
        sched.refill(1000.0);
        assert!(sched.tokens <= BURST_CAPACITY);
    }

    #[test]
    fn select_respects_token_budget() {
        let mut sched = LLMThinkScheduler::new();
        let brains: Vec<NpcBrain> = (0..10).map(|i| NpcBrain::new(format!("b{i}"), Personality::random())).collect();
        let chosen = sched.select(0.0, brains.iter(), 100.0);
        assert!(chosen.len() <= BURST_CAPACITY as usize);
    }

    #[test]
    fn fallback_always_returns_an_action() {
        for _ in 0..20 {
            let _ = BehaviorTreeFallback::choose(Personality::random());
        }
    }
}
