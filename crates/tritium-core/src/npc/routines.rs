// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Daily POI-visiting schedules, gated by personality and sim time-of-day.

use serde::{Deserialize, Serialize};

use crate::model::Position;
use crate::npc::Personality;

/// A point of interest civilian routines path toward, derived from scenario
/// zone geometry at load time (see `scenario::pois_from_zones`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub name: String,
    pub kind: PoiKind,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    Home,
    Work,
    Shop,
}

/// Sim time-of-day in hours `[0, 24)`, not wall clock.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SimTimeOfDay(pub f64);

impl SimTimeOfDay {
    #[must_use]
    pub fn from_sim_seconds(sim_seconds: f64) -> Self {
        Self((sim_seconds / 3600.0).rem_euclid(24.0))
    }
}

/// Default home→work→shop→home schedule boundaries, in sim hours.
const WORK_START: f64 = 8.0;
const SHOP_START: f64 = 17.0;
const HOME_START: f64 = 19.0;

/// Which leg of the daily routine a brain should be heading toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineLeg {
    Home,
    Work,
    Shop,
}

/// Assigns daily schedules from personality weights: sociable brains bias
/// toward shop visits, cautious brains stay closer to home.
pub struct RoutineScheduler;

impl RoutineScheduler {
    /// The routine leg a brain with `personality` should be pursuing at
    /// `tod`. High-sociability brains get an extra evening shop leg that
    /// low-sociability brains skip (going straight home).
    #[must_use]
    pub fn leg_for(tod: SimTimeOfDay, personality: Personality) -> RoutineLeg {
        let t = tod.0;
        if t >= HOME_START || t < WORK_START {
            RoutineLeg::Home
        } else if t >= SHOP_START {
            if personality.sociability > 0.4 {
                RoutineLeg::Shop
            } else {
                RoutineLeg::Home
            }
        } else {
            RoutineLeg::Work
        }
    }

    /// Pick the nearest POI of `kind` from `pois` to `from`, or `None` if
    /// none of that kind exist in the scenario.
    #[must_use]
    pub fn nearest_poi<'a>(pois: &'a [PointOfInterest], kind: PoiKind, from: Position) -> Option<&'a PointOfInterest> {
        pois.iter()
            .filter(|p| p.kind == kind)
            .min_by(|a, b| {
                a.position
                    .distance(from)
                    .partial_cmp(&b.position.distance(from))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn schedule_follows_home_work_shop_home() {
        let social = Personality::new(0.5, 0.5, 0.9, 0.2);
        assert_eq!(RoutineScheduler::leg_for(SimTimeOfDay(2.0), social), RoutineLeg::Home);
        assert_eq!(RoutineScheduler::leg_for(SimTimeOfDay(10.0), social), RoutineLeg::Work);
        assert_eq!(RoutineScheduler::leg_for(SimTimeOfDay(18.0), social), RoutineLeg::Shop);
        assert_eq!(RoutineScheduler::leg_for(SimTimeOfDay(20.0), social), RoutineLeg::Home);
    }

    #[test]
    fn low_sociability_skips_shop_leg() {
        let loner = Personality::new(0.5, 0.5, 0.1, 0.2);
        assert_eq!(RoutineScheduler::leg_for(SimTimeOfDay(18.0), loner), RoutineLeg::Home);
    }

    #[test]
    fn nearest_poi_picks_closest_of_kind() {
        let pois = vec![
            PointOfInterest { name: "Far Home".into(), kind: PoiKind::Home, position: Position::new(100.0, 0.0) },
            PointOfInterest { name: "Near Home".into(), kind: PoiKind::Home, position: Position::new(1.0, 0.0) },
        ];
        let nearest = RoutineScheduler::nearest_poi(&pois, PoiKind::Home, Position::new(0.0, 0.0)).unwrap();
        assert_eq!(nearest.name, "Near Home");
    }
}
