// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The canonical target model and the closed unit-type registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Alliance of a target. Immutable except via `AllianceManager::radicalize`
/// (neutral → hostile, see [`crate::npc::alliance`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alliance {
    /// Friendly / player-aligned.
    Friendly,
    /// Hostile / opposing.
    Hostile,
    /// Neutral civilian.
    Neutral,
    /// Unclassified.
    Unknown,
}

impl Alliance {
    /// CoT affiliation character (`f|h|n|u`).
    #[must_use]
    pub const fn cot_char(self) -> char {
        match self {
            Self::Friendly => 'f',
            Self::Hostile => 'h',
            Self::Neutral => 'n',
            Self::Unknown => 'u',
        }
    }

    /// Whether `self` and `other` are opposing alliances for targeting
    /// purposes (friendly vs hostile, in either direction).
    #[must_use]
    pub const fn is_opposed(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Friendly, Self::Hostile) | (Self::Hostile, Self::Friendly)
        )
    }
}

/// The closed set of concrete unit kinds in the unit-type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Turret,
    HeavyTurret,
    MissileTurret,
    Rover,
    Drone,
    ScoutDrone,
    Tank,
    Apc,
    Person,
    HostilePerson,
    HostileLeader,
    HostileVehicle,
    Vehicle,
    Animal,
    Camera,
    Sensor,
    SwarmDrone,
}

/// Movement category used by the pathfinder to pick a routing policy (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Never moves: turret, camera, sensor.
    Stationary,
    /// Wheeled/tracked ground vehicle: rover, tank, apc.
    Ground,
    /// Foot-mobile: person, hostile_person, hostile_leader, animal.
    Foot,
    /// Airborne, ignores street graph/obstacles: drone, scout_drone, swarm_drone.
    Air,
}

/// Static combat stats contributed by a unit type to its default `Weapon`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CombatStats {
    /// Default max health for this asset type.
    pub max_health: f64,
    /// Whether this asset type is a combatant by default.
    pub is_combatant: bool,
}

/// One immutable entry of the unit-type registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitTypeEntry {
    pub type_id: AssetType,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub cot_type: &'static str,
    pub category: Category,
    pub speed: f64,
    pub drain_rate: f64,
    pub vision_radius: f64,
    pub ambient_radius: f64,
    pub combat: CombatStats,
    pub placeable: bool,
}

fn registry() -> &'static HashMap<AssetType, UnitTypeEntry> {
    static REGISTRY: OnceLock<HashMap<AssetType, UnitTypeEntry>> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}

/// Look up the static registry entry for an asset type. Always present —
/// the registry is closed and total over `AssetType`.
#[must_use]
pub fn unit_type(asset: AssetType) -> &'static UnitTypeEntry {
    registry()
        .get(&asset)
        .unwrap_or_else(|| registry().get(&AssetType::Person).expect("registry seeded"))
}

fn build_registry() -> HashMap<AssetType, UnitTypeEntry> {
    use AssetType::{
        Animal, Apc, Camera, Drone, HeavyTurret, HostileLeader, HostilePerson, HostileVehicle,
        MissileTurret, Person, Rover, ScoutDrone, Sensor, SwarmDrone, Tank, Turret, Vehicle,
    };
    let mut m = HashMap::new();
    let mut add = |ty, entry: UnitTypeEntry| {
        m.insert(ty, entry);
    };
    add(
        Turret,
        UnitTypeEntry {
            type_id: Turret,
            display_name: "Turret",
            icon: "turret",
            cot_type: "a-f-G-U-C-F",
            category: Category::Stationary,
            speed: 0.0,
            drain_rate: 0.01,
            vision_radius: 25.0,
            ambient_radius: 0.0,
            combat: CombatStats { max_health: 150.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        HeavyTurret,
        UnitTypeEntry {
            type_id: HeavyTurret,
            display_name: "Heavy Turret",
            icon: "heavy_turret",
            cot_type: "a-f-G-U-C-F-H",
            category: Category::Stationary,
            speed: 0.0,
            drain_rate: 0.02,
            vision_radius: 35.0,
            ambient_radius: 0.0,
            combat: CombatStats { max_health: 300.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        MissileTurret,
        UnitTypeEntry {
            type_id: MissileTurret,
            display_name: "Missile Turret",
            icon: "missile_turret",
            cot_type: "a-f-G-U-C-F-M",
            category: Category::Stationary,
            speed: 0.0,
            drain_rate: 0.02,
            vision_radius: 40.0,
            ambient_radius: 0.0,
            combat: CombatStats { max_health: 200.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        Rover,
        UnitTypeEntry {
            type_id: Rover,
            display_name: "Rover",
            icon: "rover",
            cot_type: "a-f-G-E-V-U-G",
            category: Category::Ground,
            speed: 2.0,
            drain_rate: 0.05,
            vision_radius: 20.0,
            ambient_radius: 5.0,
            combat: CombatStats { max_health: 80.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        Drone,
        UnitTypeEntry {
            type_id: Drone,
            display_name: "Drone",
            icon: "drone",
            cot_type: "a-f-A-M-F-Q",
            category: Category::Air,
            speed: 5.0,
            drain_rate: 0.2,
            vision_radius: 30.0,
            ambient_radius: 8.0,
            combat: CombatStats { max_health: 40.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        ScoutDrone,
        UnitTypeEntry {
            type_id: ScoutDrone,
            display_name: "Scout Drone",
            icon: "scout_drone",
            cot_type: "a-f-A-M-F-Q-S",
            category: Category::Air,
            speed: 7.0,
            drain_rate: 0.25,
            vision_radius: 45.0,
            ambient_radius: 8.0,
            combat: CombatStats { max_health: 25.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        Tank,
        UnitTypeEntry {
            type_id: Tank,
            display_name: "Tank",
            icon: "tank",
            cot_type: "a-f-G-E-V-A-T",
            category: Category::Ground,
            speed: 1.2,
            drain_rate: 0.08,
            vision_radius: 25.0,
            ambient_radius: 6.0,
            combat: CombatStats { max_health: 250.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        Apc,
        UnitTypeEntry {
            type_id: Apc,
            display_name: "APC",
            icon: "apc",
            cot_type: "a-f-G-E-V-A-A",
            category: Category::Ground,
            speed: 2.5,
            drain_rate: 0.06,
            vision_radius: 20.0,
            ambient_radius: 6.0,
            combat: CombatStats { max_health: 120.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        Person,
        UnitTypeEntry {
            type_id: Person,
            display_name: "Person",
            icon: "person",
            cot_type: "a-n-G",
            category: Category::Foot,
            speed: 1.4,
            drain_rate: 0.0,
            vision_radius: 15.0,
            ambient_radius: 3.0,
            combat: CombatStats { max_health: 100.0, is_combatant: false },
            placeable: true,
        },
    );
    add(
        HostilePerson,
        UnitTypeEntry {
            type_id: HostilePerson,
            display_name: "Hostile Person",
            icon: "hostile_person",
            cot_type: "a-h-G-U-C-I",
            category: Category::Foot,
            speed: 1.6,
            drain_rate: 0.0,
            vision_radius: 18.0,
            ambient_radius: 3.0,
            combat: CombatStats { max_health: 100.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        HostileLeader,
        UnitTypeEntry {
            type_id: HostileLeader,
            display_name: "Hostile Leader",
            icon: "hostile_leader",
            cot_type: "a-h-G-U-C-I-L",
            category: Category::Foot,
            speed: 1.6,
            drain_rate: 0.0,
            vision_radius: 22.0,
            ambient_radius: 4.0,
            combat: CombatStats { max_health: 160.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        HostileVehicle,
        UnitTypeEntry {
            type_id: HostileVehicle,
            display_name: "Hostile Vehicle",
            icon: "hostile_vehicle",
            cot_type: "a-h-G-E-V-U",
            category: Category::Ground,
            speed: 2.2,
            drain_rate: 0.05,
            vision_radius: 22.0,
            ambient_radius: 5.0,
            combat: CombatStats { max_health: 140.0, is_combatant: true },
            placeable: true,
        },
    );
    add(
        Vehicle,
        UnitTypeEntry {
            type_id: Vehicle,
            display_name: "Vehicle",
            icon: "vehicle",
            cot_type: "a-n-G-E-V-U",
            category: Category::Ground,
            speed: 2.0,
            drain_rate: 0.05,
            vision_radius: 15.0,
            ambient_radius: 4.0,
            combat: CombatStats { max_health: 100.0, is_combatant: false },
            placeable: true,
        },
    );
    add(
        Animal,
        UnitTypeEntry {
            type_id: Animal,
            display_name: "Animal",
            icon: "animal",
            cot_type: "a-n-A-W",
            category: Category::Foot,
            speed: 1.8,
            drain_rate: 0.0,
            vision_radius: 10.0,
            ambient_radius: 2.0,
            combat: CombatStats { max_health: 30.0, is_combatant: false },
            placeable: true,
        },
    );
    add(
        Camera,
        UnitTypeEntry {
            type_id: Camera,
            display_name: "Camera",
            icon: "camera",
            cot_type: "a-f-G-E-S",
            category: Category::Stationary,
            speed: 0.0,
            drain_rate: 0.01,
            vision_radius: 30.0,
            ambient_radius: 0.0,
            combat: CombatStats { max_health: 20.0, is_combatant: false },
            placeable: true,
        },
    );
    add(
        Sensor,
        UnitTypeEntry {
            type_id: Sensor,
            display_name: "Sensor",
            icon: "sensor",
            cot_type: "a-f-G-E-S-M",
            category: Category::Stationary,
            speed: 0.0,
            drain_rate: 0.005,
            vision_radius: 12.0,
            ambient_radius: 0.0,
            combat: CombatStats { max_health: 10.0, is_combatant: false },
            placeable: true,
        },
    );
    add(
        SwarmDrone,
        UnitTypeEntry {
            type_id: SwarmDrone,
            display_name: "Swarm Drone",
            icon: "swarm_drone",
            cot_type: "a-h-A-M-F-Q-S",
            category: Category::Air,
            speed: 6.0,
            drain_rate: 0.3,
            vision_radius: 20.0,
            ambient_radius: 5.0,
            combat: CombatStats { max_health: 15.0, is_combatant: true },
            placeable: true,
        },
    );
    m
}

/// Lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Stationary,
    Active,
    Moving,
    Patrolling,
    Returning,
    Eliminated,
    Destroyed,
    Despawned,
    Escaped,
}

impl Status {
    /// True for any status the spec treats as terminal (ignored by sensors,
    /// combat acquisition, and tick advancement).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Eliminated | Self::Destroyed | Self::Despawned | Self::Escaped
        )
    }
}

/// A 2D local-meter position, `+x` = East, `+y` = North.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// The canonical per-entity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub target_id: String,
    pub name: String,
    pub alliance: Alliance,
    pub asset_type: AssetType,

    pub position: Position,
    pub lat_lng_alt: Option<(f64, f64, f64)>,
    pub heading: f64,
    pub speed: f64,
    pub waypoints: Vec<Position>,
    pub waypoint_index: usize,
    pub loop_waypoints: bool,

    pub health: f64,
    pub max_health: f64,
    pub is_combatant: bool,
    pub weapon_range: f64,
    pub weapon_cooldown: f64,
    pub weapon_damage: f64,
    pub kills: u32,
    pub squad_id: Option<String>,
    pub fsm_state: Option<String>,

    pub battery: f64,
    pub drain_rate: f64,

    pub status: Status,
    pub spawned_at: f64,
}

/// Epsilon distance (meters) within which a waypoint is considered reached.
pub const WAYPOINT_EPSILON: f64 = 0.5;

impl Target {
    /// Create a new target from its asset type's registry defaults, at the
    /// given position and spawn time (seconds of simulation monotonic time).
    #[must_use]
    pub fn spawn(
        target_id: impl Into<String>,
        name: impl Into<String>,
        alliance: Alliance,
        asset_type: AssetType,
        position: Position,
        spawned_at: f64,
    ) -> Self {
        let entry = unit_type(asset_type);
        let stationary = entry.category == Category::Stationary;
        Self {
            target_id: target_id.into(),
            name: name.into(),
            alliance,
            asset_type,
            position,
            lat_lng_alt: None,
            heading: 0.0,
            speed: if stationary { 0.0 } else { entry.speed },
            waypoints: Vec::new(),
            waypoint_index: 0,
            loop_waypoints: false,
            health: entry.combat.max_health,
            max_health: entry.combat.max_health,
            is_combatant: entry.combat.is_combatant,
            weapon_range: 0.0,
            weapon_cooldown: 0.0,
            weapon_damage: 0.0,
            kills: 0,
            squad_id: None,
            fsm_state: None,
            battery: 1.0,
            drain_rate: entry.drain_rate,
            status: if stationary { Status::Stationary } else { Status::Idle },
            spawned_at,
        }
    }

    /// Whether this target's category is stationary per the unit-type
    /// registry: speed == 0, never advances waypoints.
    #[must_use]
    pub fn is_stationary(&self) -> bool {
        unit_type(self.asset_type).category == Category::Stationary
    }

    /// Advance position toward the current waypoint at `speed` m/s. Pure
    /// on self: reads no other targets. No-op for stationary targets or
    /// terminal status.
    pub fn tick(&mut self, dt: f64) {
        if self.status.is_terminal() {
            return;
        }
        if self.is_stationary() {
            self.drain_battery(dt, false);
            return;
        }

        let moving = self.advance_along_waypoints(dt);
        self.drain_battery(dt, moving);
    }

    fn advance_along_waypoints(&mut self, dt: f64) -> bool {
        let Some(target) = self.waypoints.get(self.waypoint_index).copied() else {
            if self.status != Status::Idle {
                self.status = Status::Idle;
            }
            return false;
        };

        let remaining = self.position.distance(target);
        if remaining <= WAYPOINT_EPSILON {
            self.position = target;
            self.advance_waypoint_index();
            return false;
        }

        let step = self.speed * dt;
        if step >= remaining {
            self.position = target;
            self.advance_waypoint_index();
        } else {
            let dx = target.x - self.position.x;
            let dy = target.y - self.position.y;
            let len = (dx * dx + dy * dy).sqrt().max(f64::EPSILON);
            self.position.x += dx / len * step;
            self.position.y += dy / len * step;
            self.heading = heading_between(self.position, target);
        }
        true
    }

    fn advance_waypoint_index(&mut self) {
        self.waypoint_index += 1;
        if self.waypoint_index >= self.waypoints.len() {
            if self.loop_waypoints && !self.waypoints.is_empty() {
                self.waypoint_index = 0;
            } else {
                self.status = Status::Idle;
            }
        }
    }

    fn drain_battery(&mut self, dt: f64, moving: bool) {
        let rate = if moving { self.drain_rate } else { self.drain_rate * 0.1 };
        self.battery = (self.battery - rate * dt).max(0.0);
    }

    /// Apply damage, clamping health to `[0, max_health]`. Returns `true` the
    /// first time health reaches zero (caller emits `target_eliminated`
    /// exactly once).
    pub fn apply_damage(&mut self, amount: f64) -> bool {
        if self.status == Status::Eliminated {
            return false;
        }
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.status = Status::Eliminated;
            return true;
        }
        false
    }
}

/// Heading in degrees, 0 = North, clockwise, from `from` toward `to`.
#[must_use]
pub fn heading_between(from: Position, to: Position) -> f64 {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let deg = dx.atan2(dy).to_degrees();
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stationary_categories_never_move() {
        let mut t = Target::spawn("t1", "Turret 1", Alliance::Friendly, AssetType::Turret, Position::new(0.0, 0.0), 0.0);
        t.waypoints = vec![Position::new(100.0, 100.0)];
        for _ in 0..100 {
            t.tick(0.1);
        }
        assert_eq!(t.position, Position::new(0.0, 0.0));
        assert_eq!(t.speed, 0.0);
    }

    #[test]
    fn reaches_waypoint_and_goes_idle_without_looping() {
        let mut t = Target::spawn("t2", "Rover 1", Alliance::Friendly, AssetType::Rover, Position::new(0.0, 0.0), 0.0);
        t.waypoints = vec![Position::new(1.0, 0.0)];
        t.status = Status::Moving;
        for _ in 0..200 {
            t.tick(0.1);
        }
        assert_eq!(t.status, Status::Idle);
        assert!(t.position.distance(Position::new(1.0, 0.0)) <= WAYPOINT_EPSILON);
    }

    #[test]
    fn zero_waypoints_not_stationary_transitions_idle_without_error() {
        let mut t = Target::spawn("t3", "Rover 2", Alliance::Friendly, AssetType::Rover, Position::new(0.0, 0.0), 0.0);
        t.status = Status::Active;
        t.tick(0.1);
        assert_eq!(t.status, Status::Idle);
    }

    #[test]
    fn health_never_leaves_bounds_and_eliminated_fires_once() {
        let mut t = Target::spawn("t4", "Turret 2", Alliance::Friendly, AssetType::Turret, Position::new(0.0, 0.0), 0.0);
        assert!(!t.apply_damage(10_000.0));
        assert_eq!(t.health, 0.0);
        assert_eq!(t.status, Status::Eliminated);
        // Second hit on an already-eliminated target must not refire.
        assert!(!t.apply_damage(10.0));
    }

    #[test]
    fn loop_waypoints_wraps_index() {
        let mut t = Target::spawn("t5", "Rover 3", Alliance::Friendly, AssetType::Rover, Position::new(0.0, 0.0), 0.0);
        t.waypoints = vec![Position::new(0.1, 0.0), Position::new(0.0, 0.0)];
        t.loop_waypoints = true;
        t.status = Status::Patrolling;
        for _ in 0..50 {
            t.tick(0.1);
        }
        assert_ne!(t.status, Status::Idle);
    }

    #[test]
    fn registry_is_total_over_asset_type() {
        let e = unit_type(AssetType::SwarmDrone);
        assert_eq!(e.category, Category::Air);
        let e = unit_type(AssetType::Turret);
        assert_eq!(e.category, Category::Stationary);
    }
}
