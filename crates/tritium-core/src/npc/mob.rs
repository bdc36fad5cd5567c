// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cluster detection and mob-formation promotion.

use crate::model::{Position, Target};

/// Minimum co-located, aggression-spiking neutrals to form a mob.
pub const CLUSTER_THRESHOLD: usize = 4;
/// Radius within which neutrals are considered clustered.
pub const CLUSTER_RADIUS_M: f64 = 15.0;

/// Riot intensity band, influencing radicalization probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MobIntensity {
    Simmering,
    Agitated,
    Rioting,
}

impl MobIntensity {
    #[must_use]
    pub const fn from_size(size: usize) -> Self {
        if size >= CLUSTER_THRESHOLD * 3 {
            Self::Rioting
        } else if size >= CLUSTER_THRESHOLD * 2 {
            Self::Agitated
        } else {
            Self::Simmering
        }
    }

    /// Multiplicative boost applied to per-brain radicalization likelihood.
    #[must_use]
    pub const fn radicalization_boost(self) -> f64 {
        match self {
            Self::Simmering => 1.0,
            Self::Agitated => 1.5,
            Self::Rioting => 2.5,
        }
    }
}

/// A detected mob: a cluster of neutrals sharing a formation heading.
#[derive(Debug, Clone)]
pub struct Mob {
    pub member_ids: Vec<String>,
    pub centroid: Position,
    pub heading: f64,
    pub intensity: MobIntensity,
}

/// Detects clusters of nearby neutrals with correlated aggression spikes
/// and promotes them to a shared-heading mob formation.
#[derive(Default)]
pub struct MobManager {
    mobs: Vec<Mob>,
}

impl MobManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mobs(&self) -> &[Mob] {
        &self.mobs
    }

    /// Recompute mob membership from current neutral positions and
    /// per-brain "agitated" flags (recent-aggression-spike indicator,
    /// computed by the caller from memory/FSM state).
    pub fn recompute(&mut self, candidates: &[(&Target, bool)]) {
        self.mobs.clear();
        let agitated: Vec<&Target> = candidates.iter().filter(|(_, flagged)| *flagged).map(|(t, _)| *t).collect();
        let mut visited = vec![false; agitated.len()];

        for i in 0..agitated.len() {
            if visited[i] {
                continue;
            }
            let mut cluster = vec![i];
            visited[i] = true;
            let mut frontier = vec![i];
            while let Some(cur) = frontier.pop() {
                for j in 0..agitated.len() {
                    if !visited[j] && agitated[cur].position.distance(agitated[j].position) <= CLUSTER_RADIUS_M {
                        visited[j] = true;
                        cluster.push(j);
                        frontier.push(j);
                    }
                }
            }

            if cluster.len() >= CLUSTER_THRESHOLD {
                let members: Vec<&Target> = cluster.iter().map(|&idx| agitated[idx]).collect();
                let centroid = centroid_of(&members);
                let heading = members.first().map_or(0.0, |m| m.heading);
                self.mobs.push(Mob {
                    member_ids: members.iter().map(|t| t.target_id.clone()).collect(),
                    centroid,
                    heading,
                    intensity: MobIntensity::from_size(members.len()),
                });
            }
        }
    }
}

fn centroid_of(members: &[&Target]) -> Position {
    let n = members.len().max(1) as f64;
    let (sx, sy) = members.iter().fold((0.0, 0.0), |(sx, sy), t| (sx + t.position.x, sy + t.position.y));
    Position::new(sx / n, sy / n)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Alliance, AssetType};

    fn neutral_at(id: &str, pos: Position) -> Target {
        Target::spawn(id, id, Alliance::Neutral, AssetType::Person, pos, 0.0)
    }

    #[test]
    fn clusters_of_threshold_or_more_form_a_mob() {
        let targets = vec![
            neutral_at("a", Position::new(0.0, 0.0)),
            neutral_at("b", Position::new(2.0, 0.0)),
            neutral_at("c", Position::new(4.0, 0.0)),
            neutral_at("d", Position::new(1.0, 2.0)),
        ];
        let candidates: Vec<(&Target, bool)> = targets.iter().map(|t| (t, true)).collect();
        let mut mgr = MobManager::new();
        mgr.recompute(&candidates);
        assert_eq!(mgr.mobs().len(), 1);
        assert_eq!(mgr.mobs()[0].member_ids.len(), 4);
    }

    #[test]
    fn below_threshold_forms_no_mob() {
        let targets = vec![neutral_at("a", Position::new(0.0, 0.0)), neutral_at("b", Position::new(2.0, 0.0))];
        let candidates: Vec<(&Target, bool)> = targets.iter().map(|t| (t, true)).collect();
        let mut mgr = MobManager::new();
        mgr.recompute(&candidates);
        assert!(mgr.mobs().is_empty());
    }
}
