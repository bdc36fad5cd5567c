// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Adaptive per-wave difficulty multiplier, grounded in
//! `original_source/src/engine/simulation/difficulty.py`.

use serde::{Deserialize, Serialize};

const MIN_MULTIPLIER: f64 = 0.5;
const MAX_MULTIPLIER: f64 = 2.0;
const ADJUSTMENT_STEP: f64 = 0.1;

const WEIGHT_ELIMINATION: f64 = 0.4;
const WEIGHT_TIME: f64 = 0.2;
const WEIGHT_DAMAGE: f64 = 0.2;
const WEIGHT_ESCAPES: f64 = 0.2;

const FAST_WAVE_TIME: f64 = 20.0;
const SLOW_WAVE_TIME: f64 = 60.0;

/// Threshold above which the *Hardened* wave variant activates.
pub const HARDENED_THRESHOLD: f64 = 1.5;
/// Threshold below which the *Easy* wave variant activates.
pub const EASY_THRESHOLD: f64 = 0.7;

/// Raw per-wave performance inputs feeding the adaptive difficulty curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveStats {
    pub eliminations: u32,
    pub hostiles_spawned: u32,
    pub wave_time: f64,
    pub friendly_damage_taken: f64,
    pub friendly_max_health: f64,
    pub escapes: u32,
}

/// A recorded wave outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WaveRecord {
    pub elimination_rate: f64,
    pub wave_time: f64,
    pub friendly_damage_ratio: f64,
    pub escapes: u32,
    pub hostiles_spawned: u32,
}

/// Wave-start parameters derived from the current multiplier.
#[derive(Debug, Clone, Copy)]
pub struct WaveAdjustments {
    pub hostile_count: u32,
    pub hostile_health_bonus: f64,
    pub hostile_speed_bonus: f64,
    pub hardened: bool,
    pub flank_chance_boost: f64,
    pub use_cover_seeking: bool,
    pub elite_count: u32,
    pub easy: bool,
    pub disable_flanking: bool,
    pub speed_reduction: f64,
}

/// Tracks performance and computes the adaptive difficulty multiplier.
pub struct DifficultyScaler {
    multiplier: f64,
    wave_history: Vec<WaveRecord>,
    last_elimination_rate: f64,
}

impl Default for DifficultyScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl DifficultyScaler {
    #[must_use]
    pub fn new() -> Self {
        Self { multiplier: 1.0, wave_history: Vec::new(), last_elimination_rate: 0.0 }
    }

    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    #[must_use]
    pub fn wave_history(&self) -> &[WaveRecord] {
        &self.wave_history
    }

    #[must_use]
    pub fn last_elimination_rate(&self) -> f64 {
        self.last_elimination_rate
    }

    /// Record a completed wave's performance and adjust the multiplier.
    pub fn record_wave(&mut self, stats: WaveStats) {
        let (elimination_rate, escape_rate) = if stats.hostiles_spawned > 0 {
            (
                f64::from(stats.eliminations) / f64::from(stats.hostiles_spawned),
                f64::from(stats.escapes) / f64::from(stats.hostiles_spawned),
            )
        } else {
            (0.0, 0.0)
        };
        let friendly_damage_ratio = if stats.friendly_max_health > 0.0 {
            stats.friendly_damage_taken / stats.friendly_max_health
        } else {
            0.0
        };

        self.last_elimination_rate = elimination_rate;

        let record = WaveRecord {
            elimination_rate,
            wave_time: stats.wave_time,
            friendly_damage_ratio,
            escapes: stats.escapes,
            hostiles_spawned: stats.hostiles_spawned,
        };
        self.wave_history.push(record);

        let score = Self::performance_score(record, escape_rate);
        let adjustment = score * ADJUSTMENT_STEP;
        self.multiplier = (self.multiplier + adjustment).clamp(MIN_MULTIPLIER, MAX_MULTIPLIER);
    }

    fn performance_score(record: WaveRecord, escape_rate: f64) -> f64 {
        let elim_score = (record.elimination_rate - 0.5) * 2.0;

        let time_score = if record.wave_time <= FAST_WAVE_TIME {
            1.0
        } else if record.wave_time >= SLOW_WAVE_TIME {
            -1.0
        } else {
            1.0 - 2.0 * (record.wave_time - FAST_WAVE_TIME) / (SLOW_WAVE_TIME - FAST_WAVE_TIME)
        };

        let damage_score = 1.0 - 2.0 * record.friendly_damage_ratio.min(1.0);
        let escape_score = 1.0 - 2.0 * escape_rate.min(1.0);

        let score = WEIGHT_ELIMINATION * elim_score
            + WEIGHT_TIME * time_score
            + WEIGHT_DAMAGE * damage_score
            + WEIGHT_ESCAPES * escape_score;
        score.clamp(-1.0, 1.0)
    }

    /// Compute next-wave adjustments from the current multiplier.
    #[must_use]
    pub fn wave_adjustments(&self, base_count: u32) -> WaveAdjustments {
        let m = self.multiplier;
        let hostile_count = (f64::from(base_count) * m).round().max(1.0) as u32;
        let hostile_health_bonus = ((m - 1.0) * 0.3).max(0.0);
        let hostile_speed_bonus = ((m - 1.0) * 0.15).max(0.0);

        let hardened = m > HARDENED_THRESHOLD;
        let (flank_chance_boost, use_cover_seeking, elite_count) = if hardened {
            ((m - HARDENED_THRESHOLD) * 0.5, true, 1)
        } else {
            (0.0, false, 0)
        };

        let easy = m < EASY_THRESHOLD;
        let (disable_flanking, speed_reduction) =
            if easy { (true, (EASY_THRESHOLD - m) * 0.3) } else { (false, 0.0) };

        WaveAdjustments {
            hostile_count,
            hostile_health_bonus,
            hostile_speed_bonus,
            hardened,
            flank_chance_boost,
            use_cover_seeking,
            elite_count,
            easy,
            disable_flanking,
            speed_reduction,
        }
    }

    /// Reset all difficulty state (engine reset).
    pub fn reset(&mut self) {
        self.multiplier = 1.0;
        self.wave_history.clear();
        self.last_elimination_rate = 0.0;
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_stays_in_bounds_after_any_sequence() {
        let mut scaler = DifficultyScaler::new();
        for _ in 0..50 {
            scaler.record_wave(WaveStats {
                eliminations: 10,
                hostiles_spawned: 10,
                wave_time: 5.0,
                friendly_damage_taken: 0.0,
                friendly_max_health: 100.0,
                escapes: 0,
            });
            assert!(scaler.multiplier() >= 0.5 && scaler.multiplier() <= 2.0);
        }
        for _ in 0..50 {
            scaler.record_wave(WaveStats {
                eliminations: 0,
                hostiles_spawned: 10,
                wave_time: 120.0,
                friendly_damage_taken: 100.0,
                friendly_max_health: 100.0,
                escapes: 10,
            });
            assert!(scaler.multiplier() >= 0.5 && scaler.multiplier() <= 2.0);
        }
    }

    #[test]
    fn adaptive_difficulty_up_scenario() {
        let mut scaler = DifficultyScaler::new();
        for _ in 0..3 {
            scaler.record_wave(WaveStats {
                eliminations: 5,
                hostiles_spawned: 5,
                wave_time: 15.0,
                friendly_damage_taken: 0.0,
                friendly_max_health: 100.0,
                escapes: 0,
            });
        }
        assert!((scaler.multiplier() - 1.3).abs() < 0.01);
        let adj = scaler.wave_adjustments(5);
        assert_eq!(adj.hostile_count, 7);
    }

    #[test]
    fn hardened_and_easy_thresholds() {
        let mut scaler = DifficultyScaler::new();
        // Force multiplier above 1.5 by repeated perfect waves.
        for _ in 0..10 {
            scaler.record_wave(WaveStats {
                eliminations: 10,
                hostiles_spawned: 10,
                wave_time: 1.0,
                friendly_damage_taken: 0.0,
                friendly_max_health: 100.0,
                escapes: 0,
            });
        }
        let adj = scaler.wave_adjustments(1);
        assert!(adj.hardened);
        assert_eq!(adj.elite_count, 1);

        scaler.reset();
        for _ in 0..10 {
            scaler.record_wave(WaveStats {
                eliminations: 0,
                hostiles_spawned: 10,
                wave_time: 120.0,
                friendly_damage_taken: 100.0,
                friendly_max_health: 100.0,
                escapes: 10,
            });
        }
        let adj = scaler.wave_adjustments(1);
        assert!(adj.easy);
        assert!(adj.disable_flanking);
    }
}
