// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-unit weapon state: ammo, reload, cooldown classes.
//!
//! Default loadouts by asset type mirror a `_DEFAULT_WEAPONS` table keyed
//! per unit kind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::model::AssetType;

/// Weapon damage delivery class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponClass {
    /// Standard projectile with travel time.
    Ballistic,
    /// Instant hit, no projectile.
    Beam,
    /// Area of effect with blast radius.
    Aoe,
    /// Tracking projectile.
    Missile,
}

/// Weapon configuration and mutable ammo state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub damage: f64,
    pub weapon_range: f64,
    pub cooldown: f64,
    pub accuracy: f64,
    pub ammo: u32,
    pub max_ammo: u32,
    pub weapon_class: WeaponClass,
    pub blast_radius: f64,
}

impl Default for Weapon {
    fn default() -> Self {
        Self {
            name: "nerf_blaster".to_string(),
            damage: 10.0,
            weapon_range: 15.0,
            cooldown: 2.0,
            accuracy: 0.85,
            ammo: 30,
            max_ammo: 30,
            weapon_class: WeaponClass::Ballistic,
            blast_radius: 0.0,
        }
    }
}

fn default_weapon_for(key: &str) -> Option<Weapon> {
    let w = match key {
        "turret" => Weapon {
            name: "nerf_turret_gun".into(),
            damage: 15.0,
            weapon_range: 20.0,
            cooldown: 1.5,
            accuracy: 0.9,
            ammo: 100,
            max_ammo: 100,
            ..Weapon::default()
        },
        "drone" => Weapon {
            name: "nerf_dart_gun".into(),
            damage: 8.0,
            weapon_range: 12.0,
            cooldown: 1.0,
            accuracy: 0.75,
            ammo: 20,
            max_ammo: 20,
            ..Weapon::default()
        },
        "rover" => Weapon {
            name: "nerf_cannon".into(),
            damage: 12.0,
            weapon_range: 10.0,
            cooldown: 2.0,
            accuracy: 0.85,
            ammo: 40,
            max_ammo: 40,
            ..Weapon::default()
        },
        "person_hostile" => Weapon {
            name: "nerf_pistol".into(),
            damage: 10.0,
            weapon_range: 8.0,
            cooldown: 2.5,
            accuracy: 0.6,
            ammo: 15,
            max_ammo: 15,
            ..Weapon::default()
        },
        "tank" => Weapon {
            name: "nerf_tank_cannon".into(),
            damage: 30.0,
            weapon_range: 25.0,
            cooldown: 3.0,
            accuracy: 0.8,
            ammo: 20,
            max_ammo: 20,
            weapon_class: WeaponClass::Aoe,
            blast_radius: 3.0,
        },
        "apc" => Weapon {
            name: "nerf_apc_mg".into(),
            damage: 8.0,
            weapon_range: 15.0,
            cooldown: 1.0,
            accuracy: 0.7,
            ammo: 60,
            max_ammo: 60,
            ..Weapon::default()
        },
        "heavy_turret" => Weapon {
            name: "nerf_heavy_turret".into(),
            damage: 25.0,
            weapon_range: 30.0,
            cooldown: 2.5,
            accuracy: 0.85,
            ammo: 50,
            max_ammo: 50,
            ..Weapon::default()
        },
        "missile_turret" => Weapon {
            name: "nerf_missile_launcher".into(),
            damage: 50.0,
            weapon_range: 35.0,
            cooldown: 5.0,
            accuracy: 0.95,
            ammo: 10,
            max_ammo: 10,
            weapon_class: WeaponClass::Missile,
            ..Weapon::default()
        },
        "scout_drone" => Weapon {
            name: "nerf_scout_gun".into(),
            damage: 5.0,
            weapon_range: 8.0,
            cooldown: 1.5,
            accuracy: 0.65,
            ammo: 15,
            max_ammo: 15,
            ..Weapon::default()
        },
        _ => return None,
    };
    Some(w)
}

fn asset_key(asset: AssetType, alliance_hostile: bool) -> &'static str {
    match asset {
        AssetType::Turret => "turret",
        AssetType::HeavyTurret => "heavy_turret",
        AssetType::MissileTurret => "missile_turret",
        AssetType::Drone => "drone",
        AssetType::ScoutDrone => "scout_drone",
        AssetType::Rover => "rover",
        AssetType::Tank => "tank",
        AssetType::Apc => "apc",
        AssetType::Person | AssetType::HostilePerson | AssetType::HostileLeader
            if alliance_hostile =>
        {
            "person_hostile"
        }
        _ => "",
    }
}

/// Seconds to fully restore ammo after it reaches zero.
pub const RELOAD_DURATION_S: f64 = 3.0;

/// Fraction of `max_ammo` below which `ammo_low` fires (once per crossing).
pub const LOW_AMMO_THRESHOLD: f64 = 0.2;

/// Manages per-unit weapon state and reload timers.
pub struct WeaponSystem {
    weapons: HashMap<String, Weapon>,
    reload_timers: HashMap<String, f64>,
    low_ammo_notified: std::collections::HashSet<String>,
}

impl Default for WeaponSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl WeaponSystem {
    #[must_use]
    pub fn new() -> Self {
        Self {
            weapons: HashMap::new(),
            reload_timers: HashMap::new(),
            low_ammo_notified: std::collections::HashSet::new(),
        }
    }

    /// Equip the default weapon loadout for `asset_type`; generic fallback if
    /// the asset type has no registered default.
    pub fn equip(&mut self, target_id: &str, asset_type: AssetType, hostile: bool) {
        let key = asset_key(asset_type, hostile);
        let weapon = default_weapon_for(key).unwrap_or_default();
        self.weapons.insert(target_id.to_string(), weapon);
    }

    /// Assign an explicit weapon, overriding any default.
    pub fn assign(&mut self, target_id: &str, weapon: Weapon) {
        self.weapons.insert(target_id.to_string(), weapon);
    }

    #[must_use]
    pub fn get(&self, target_id: &str) -> Option<&Weapon> {
        self.weapons.get(target_id)
    }

    #[must_use]
    pub fn ammo(&self, target_id: &str) -> u32 {
        self.weapons.get(target_id).map_or(0, |w| w.ammo)
    }

    #[must_use]
    pub fn is_reloading(&self, target_id: &str) -> bool {
        self.reload_timers.contains_key(target_id)
    }

    /// Consume one round. Returns `false` if the unit has no ammo left (or
    /// has no weapon, in which case this is a no-op that returns `true` —
    /// unarmed units are treated as unconstrained by ammo).
    pub async fn consume_ammo(&mut self, target_id: &str, bus: &EventBus) -> bool {
        let Some(weapon) = self.weapons.get_mut(target_id) else {
            return true;
        };
        if weapon.ammo == 0 {
            return false;
        }
        weapon.ammo -= 1;
        let ammo = weapon.ammo;
        let max_ammo = weapon.max_ammo;
        let name = weapon.name.clone();
        if ammo == 0 {
            bus.publish(
                "ammo_depleted",
                serde_json::json!({ "target_id": target_id, "weapon_name": name }),
            )
            .await;
        } else if max_ammo > 0 && f64::from(ammo) / f64::from(max_ammo) < LOW_AMMO_THRESHOLD {
            if self.low_ammo_notified.insert(target_id.to_string()) {
                bus.publish(
                    "ammo_low",
                    serde_json::json!({
                        "target_id": target_id,
                        "weapon_name": name,
                        "ammo_remaining": ammo,
                        "ammo_pct": f64::from(ammo) / f64::from(max_ammo),
                    }),
                )
                .await;
            }
        }
        true
    }

    /// Advance reload timers; restore ammo and emit `ammo_reloaded` on
    /// completion.
    pub async fn tick(&mut self, dt: f64, bus: &EventBus) {
        let mut starting = Vec::new();
        for (id, w) in &self.weapons {
            if w.ammo == 0 && !self.reload_timers.contains_key(id) {
                starting.push(id.clone());
            }
        }
        for id in starting {
            self.reload_timers.insert(id, RELOAD_DURATION_S);
        }

        let mut completed = Vec::new();
        for (id, remaining) in &mut self.reload_timers {
            *remaining -= dt;
            if *remaining <= 0.0 {
                completed.push(id.clone());
            }
        }
        for id in completed {
            self.reload_timers.remove(&id);
            self.low_ammo_notified.remove(&id);
            if let Some(w) = self.weapons.get_mut(&id) {
                w.ammo = w.max_ammo;
                bus.publish(
                    "ammo_reloaded",
                    serde_json::json!({ "target_id": id, "weapon_name": w.name }),
                )
                .await;
            }
        }
    }

    /// Remove all weapon/reload state (engine reset).
    pub fn reset(&mut self) {
        self.weapons.clear();
        self.reload_timers.clear();
        self.low_ammo_notified.clear();
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ammo_is_monotone_nonincreasing_between_reloads() {
        let bus = EventBus::new();
        let mut ws = WeaponSystem::new();
        ws.equip("u1", AssetType::Turret, false);
        let mut last = ws.ammo("u1");
        for _ in 0..10 {
            ws.consume_ammo("u1", &bus).await;
            let now = ws.ammo("u1");
            assert!(now <= last);
            last = now;
        }
    }

    #[tokio::test]
    async fn ammo_depleted_fires_exactly_once_per_depletion() {
        let bus = EventBus::new();
        let (_id, mut rx) = bus.subscribe().await.expect("open");
        let mut ws = WeaponSystem::new();
        ws.assign(
            "u2",
            Weapon { ammo: 1, max_ammo: 1, ..Weapon::default() },
        );
        ws.consume_ammo("u2", &bus).await;
        let ev = rx.try_recv().expect("ammo_depleted");
        assert_eq!(ev.topic, "ammo_depleted");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reload_restores_full_ammo_after_duration() {
        let bus = EventBus::new();
        let mut ws = WeaponSystem::new();
        ws.assign("u3", Weapon { ammo: 0, max_ammo: 5, ..Weapon::default() });
        for _ in 0..40 {
            ws.tick(0.1, &bus).await;
        }
        assert_eq!(ws.ammo("u3"), 5);
        assert!(!ws.is_reloading("u3"));
    }

    #[test]
    fn unknown_asset_type_falls_back_to_generic_weapon() {
        let mut ws = WeaponSystem::new();
        ws.equip("u4", AssetType::Animal, false);
        assert_eq!(ws.get("u4").expect("weapon").name, "nerf_blaster");
    }
}
