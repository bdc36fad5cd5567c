// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-brain personality vector.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Four independent traits, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub curiosity: f64,
    pub caution: f64,
    pub sociability: f64,
    pub aggression: f64,
}

impl Personality {
    #[must_use]
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            curiosity: rng.gen_range(0.0..=1.0),
            caution: rng.gen_range(0.0..=1.0),
            sociability: rng.gen_range(0.0..=1.0),
            aggression: rng.gen_range(0.0..=1.0),
        }
    }

    #[must_use]
    pub fn new(curiosity: f64, caution: f64, sociability: f64, aggression: f64) -> Self {
        Self {
            curiosity: curiosity.clamp(0.0, 1.0),
            caution: caution.clamp(0.0, 1.0),
            sociability: sociability.clamp(0.0, 1.0),
            aggression: aggression.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn random_traits_stay_in_unit_interval() {
        for _ in 0..50 {
            let p = Personality::random();
            assert!((0.0..=1.0).contains(&p.curiosity));
            assert!((0.0..=1.0).contains(&p.caution));
            assert!((0.0..=1.0).contains(&p.sociability));
            assert!((0.0..=1.0).contains(&p.aggression));
        }
    }

    #[test]
    fn new_clamps_out_of_range_inputs() {
        let p = Personality::new(-1.0, 2.0, 0.5, 0.5);
        assert_eq!(p.curiosity, 0.0);
        assert_eq!(p.caution, 1.0);
    }
}
