// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Zones, waves, and scenarios, plus the scenario loader.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{AssetType, Position};
use crate::npc::routines::{PoiKind, PointOfInterest};

/// Zone kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub zone_type: String,
    pub center: Position,
    pub shape: ZoneShape,
    pub events: Vec<String>,
}

/// Maps a zone's free-text `zone_type` to the [`PoiKind`] civilian routines
/// path toward, or `None` for zone types with no routine meaning (e.g. a
/// pure spawn/objective zone).
#[must_use]
fn poi_kind_for_zone_type(zone_type: &str) -> Option<PoiKind> {
    match zone_type.to_ascii_lowercase().as_str() {
        "home" | "residential" | "residence" => Some(PoiKind::Home),
        "work" | "office" | "industrial" => Some(PoiKind::Work),
        "shop" | "commercial" | "retail" | "market" => Some(PoiKind::Shop),
        _ => None,
    }
}

/// Derive a scenario's POI list from its zones, placing one POI at each
/// zone's center. Zone types with no routine meaning are skipped. This is
/// the local-geometry fallback used when a scenario file supplies `zones`
/// but no explicit `pois`.
#[must_use]
pub fn pois_from_zones(zones: &[Zone]) -> Vec<PointOfInterest> {
    zones
        .iter()
        .filter_map(|zone| {
            let kind = poi_kind_for_zone_type(&zone.zone_type)?;
            Some(PointOfInterest { name: zone.name.clone(), kind, position: zone.center })
        })
        .collect()
}

/// A zone's geometry: either a circle or an arbitrary polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ZoneShape {
    Circle { radius: f64 },
    Polygon { points: Vec<Position> },
}

/// One group of units spawned together within a wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnGroup {
    pub asset_type: AssetType,
    pub count: u32,
    pub spawn_interval: f64,
    pub delay: f64,
    pub edge: MapEdge,
}

/// Which edge of the map a spawn group enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapEdge {
    North,
    South,
    East,
    West,
}

/// An ordered wave definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveDefinition {
    pub groups: Vec<SpawnGroup>,
}

/// A full playable mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub map_bounds: f64,
    pub max_hostiles: u32,
    pub defenders: Vec<DefenderPlacement>,
    pub waves: Vec<WaveDefinition>,
    /// Optional explicit map center; falls back to the configured geo
    /// reference point when absent.
    pub map_center: Option<(f64, f64, f64)>,
    /// Named areas (home/work/shop/objective/...) used for events and POI
    /// derivation. Defaults to empty for scenario files predating zones.
    #[serde(default)]
    pub zones: Vec<Zone>,
    /// Points of interest civilian routines path toward. If a scenario file
    /// omits this, [`ScenarioLoader::load`] derives it from `zones`.
    #[serde(default)]
    pub pois: Vec<PointOfInterest>,
}

/// A pre-placed friendly unit at scenario start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenderPlacement {
    pub name: String,
    pub asset_type: AssetType,
    pub position: Position,
}

/// Errors from loading scenario files.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("io error reading {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("malformed scenario json in {path}: {source}")]
    Decode { path: PathBuf, #[source] source: serde_json::Error },
    #[error("no scenario named {0}")]
    NotFound(String),
}

/// Loads `Scenario` definitions from a directory of JSON files
/// (`scenarios/battle/*.json`).
pub struct ScenarioLoader {
    dir: PathBuf,
}

impl ScenarioLoader {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List scenario names available in the directory (file stem of each
    /// `*.json`, sorted).
    pub fn list(&self) -> Result<Vec<String>, ScenarioError> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(&self.dir).map_err(|e| ScenarioError::Io {
            path: self.dir.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| ScenarioError::Io { path: self.dir.clone(), source: e })?;
            let path = entry.path();
            if path.extension().and_then(std::ffi::OsStr::to_str) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(std::ffi::OsStr::to_str) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Load a scenario by name, falling back to `default_center` when the
    /// scenario's JSON omits `map_center`.
    pub fn load(&self, name: &str, default_center: (f64, f64, f64)) -> Result<Scenario, ScenarioError> {
        let path = self.path_for(name);
        let bytes = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScenarioError::NotFound(name.to_string())
            } else {
                ScenarioError::Io { path: path.clone(), source: e }
            }
        })?;
        let mut scenario: Scenario =
            serde_json::from_slice(&bytes).map_err(|e| ScenarioError::Decode { path, source: e })?;
        if scenario.map_center.is_none() {
            scenario.map_center = Some(default_center);
        }
        if scenario.pois.is_empty() {
            scenario.pois = pois_from_zones(&scenario.zones);
        }
        Ok(scenario)
    }

    fn path_for(&self, name: &str) -> PathBuf {
        Path::new(&self.dir).join(format!("{name}.json"))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_scenario_is_not_found() {
        let loader = ScenarioLoader::new("/nonexistent/scenarios/battle");
        let err = loader.load("alpha", (0.0, 0.0, 0.0));
        assert!(matches!(err, Err(ScenarioError::Io { .. })) || matches!(err, Err(ScenarioError::NotFound(_))));
    }

    #[test]
    fn pois_from_zones_maps_known_types_and_skips_others() {
        let zones = vec![
            Zone {
                name: "Residential Block".into(),
                zone_type: "residential".into(),
                center: Position::new(10.0, 10.0),
                shape: ZoneShape::Circle { radius: 20.0 },
                events: Vec::new(),
            },
            Zone {
                name: "Warehouse".into(),
                zone_type: "industrial".into(),
                center: Position::new(-10.0, 5.0),
                shape: ZoneShape::Circle { radius: 15.0 },
                events: Vec::new(),
            },
            Zone {
                name: "Forward Objective".into(),
                zone_type: "objective".into(),
                center: Position::new(0.0, 0.0),
                shape: ZoneShape::Circle { radius: 5.0 },
                events: Vec::new(),
            },
        ];
        let pois = pois_from_zones(&zones);
        assert_eq!(pois.len(), 2);
        assert!(pois.iter().any(|p| p.kind == PoiKind::Home && p.name == "Residential Block"));
        assert!(pois.iter().any(|p| p.kind == PoiKind::Work && p.name == "Warehouse"));
    }
}
