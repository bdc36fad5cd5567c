// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Target acquisition, projectiles, damage resolution.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::model::{Position, Status, Target};
use crate::weapons::{Weapon, WeaponClass, WeaponSystem};

/// A simple building footprint used for line-of-sight blocking and the
/// pathfinder's neutral-foot segment rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub polygon: Vec<Position>,
}

impl Obstacle {
    #[must_use]
    pub fn contains(&self, p: Position) -> bool {
        point_in_polygon(p, &self.polygon)
    }

    #[must_use]
    pub fn blocks_segment(&self, a: Position, b: Position) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }
        let n = self.polygon.len();
        if n < 2 {
            return false;
        }
        for i in 0..n {
            let c = self.polygon[i];
            let d = self.polygon[(i + 1) % n];
            if segments_intersect(a, b, c, d) {
                return true;
            }
        }
        false
    }
}

fn point_in_polygon(p: Position, poly: &[Position]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = poly[i];
        let pj = poly[j];
        let intersects = (pi.y > p.y) != (pj.y > p.y)
            && p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
        if intersects {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn segments_intersect(a: Position, b: Position, c: Position, d: Position) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

fn cross(o: Position, a: Position, b: Position) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Returns true if any obstacle blocks the straight segment `a`-`b`.
#[must_use]
pub fn los_blocked(a: Position, b: Position, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().any(|o| o.blocks_segment(a, b))
}

/// Sample a 25%-interval segment for the neutral-foot pathfinding policy
///: reject if any sample point lies inside a building polygon.
#[must_use]
pub fn segment_crosses_building(a: Position, b: Position, obstacles: &[Obstacle]) -> bool {
    for i in 1..4 {
        let t = f64::from(i) * 0.25;
        let p = Position::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
        if obstacles.iter().any(|o| o.contains(p)) {
            return true;
        }
    }
    false
}

/// A finite-life projectile in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: String,
    pub shooter_id: String,
    pub target_id: String,
    pub origin: Position,
    pub current: Position,
    pub velocity_mps: f64,
    pub weapon_class: WeaponClass,
    pub damage: f64,
    pub accuracy: f64,
    pub weapon_range: f64,
    pub blast_radius: f64,
    pub spawn_time: f64,
    pub elapsed: f64,
    pub max_lifetime: f64,
    pub heading: f64,
}

/// Nominal ballistic projectile speed (m/s) when the weapon doesn't specify
/// one explicitly.
pub const NOMINAL_PROJECTILE_SPEED: f64 = 40.0;

/// Missile maximum turn rate, degrees per second.
pub const MISSILE_MAX_TURN_RATE_DPS: f64 = 60.0;

/// Manages target acquisition, projectile flight, and damage resolution.
pub struct CombatSystem {
    cooldowns: HashMap<String, f64>,
    projectiles: Vec<Projectile>,
    next_id: u64,
    /// If true, AoE blast damages the firing unit too. Defaults to false.
    pub aoe_self_damage: bool,
}

impl Default for CombatSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatSystem {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cooldowns: HashMap::new(),
            projectiles: Vec::new(),
            next_id: 0,
            aoe_self_damage: false,
        }
    }

    #[must_use]
    pub fn active_projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("proj-{}", self.next_id)
    }

    /// Run one tick of acquisition, firing, projectile advance, and
    /// resolution.
    #[allow(clippy::too_many_lines)]
    pub async fn tick(
        &mut self,
        dt: f64,
        now: f64,
        targets: &mut HashMap<String, Target>,
        weapons: &mut WeaponSystem,
        obstacles: &[Obstacle],
        bus: &EventBus,
    ) {
        self.acquire_and_fire(now, targets, weapons, obstacles, bus).await;
        self.advance_projectiles(dt, targets, bus).await;
        for remaining in self.cooldowns.values_mut() {
            *remaining = (*remaining - dt).max(0.0);
        }
    }

    async fn acquire_and_fire(
        &mut self,
        now: f64,
        targets: &mut HashMap<String, Target>,
        weapons: &mut WeaponSystem,
        obstacles: &[Obstacle],
        bus: &EventBus,
    ) {
        let mut shooter_ids: Vec<String> = targets
            .values()
            .filter(|t| t.is_combatant && !t.status.is_terminal())
            .map(|t| t.target_id.clone())
            .collect();
        shooter_ids.sort();

        for shooter_id in shooter_ids {
            let ready = self.cooldowns.get(&shooter_id).copied().unwrap_or(0.0) <= 0.0;
            if !ready {
                continue;
            }
            let Some(weapon) = weapons.get(&shooter_id).cloned() else {
                continue;
            };
            if weapon.ammo == 0 || weapon.weapon_range <= 0.0 {
                continue;
            }
            let Some(shooter_pos) = targets.get(&shooter_id).map(|t| t.position) else {
                continue;
            };
            let Some(shooter_alliance) = targets.get(&shooter_id).map(|t| t.alliance) else {
                continue;
            };

            let mut best: Option<(String, f64)> = None;
            let mut ids: Vec<&String> = targets.keys().collect();
            ids.sort();
            for tid in ids {
                if *tid == shooter_id {
                    continue;
                }
                let t = &targets[tid];
                if t.status.is_terminal() || !shooter_alliance.is_opposed(t.alliance) {
                    continue;
                }
                let d = shooter_pos.distance(t.position);
                if d > weapon.weapon_range {
                    continue;
                }
                if los_blocked(shooter_pos, t.position, obstacles) {
                    continue;
                }
                match &best {
                    Some((_, bd)) if *bd <= d => {}
                    _ => best = Some((tid.clone(), d)),
                }
            }

            let Some((target_id, distance)) = best else {
                continue;
            };

            if !weapons.consume_ammo(&shooter_id, bus).await {
                continue;
            }
            self.cooldowns.insert(shooter_id.clone(), weapon.cooldown);
            bus.publish(
                "shot_fired",
                serde_json::json!({ "shooter_id": shooter_id, "target_id": target_id, "weapon": weapon.name }),
            )
            .await;

            match weapon.weapon_class {
                WeaponClass::Beam => {
                    self.resolve_beam(now, &shooter_id, &target_id, distance, &weapon, targets, bus)
                        .await;
                }
                WeaponClass::Ballistic | WeaponClass::Aoe | WeaponClass::Missile => {
                    self.spawn_projectile(now, &shooter_id, &target_id, shooter_pos, &weapon, targets);
                }
            }
        }
    }

    fn spawn_projectile(
        &mut self,
        now: f64,
        shooter_id: &str,
        target_id: &str,
        origin: Position,
        weapon: &Weapon,
        targets: &HashMap<String, Target>,
    ) {
        let id = self.fresh_id();
        let target_pos = targets.get(target_id).map_or(origin, |t| t.position);
        let heading = crate::model::heading_between(origin, target_pos);
        let max_lifetime = if weapon.weapon_range > 0.0 {
            weapon.weapon_range / NOMINAL_PROJECTILE_SPEED.max(1.0)
        } else {
            5.0
        };
        self.projectiles.push(Projectile {
            id,
            shooter_id: shooter_id.to_string(),
            target_id: target_id.to_string(),
            origin,
            current: origin,
            velocity_mps: NOMINAL_PROJECTILE_SPEED,
            weapon_class: weapon.weapon_class,
            damage: weapon.damage,
            accuracy: weapon.accuracy,
            weapon_range: weapon.weapon_range,
            blast_radius: weapon.blast_radius,
            spawn_time: now,
            elapsed: 0.0,
            max_lifetime,
            heading,
        });
    }

    async fn advance_projectiles(
        &mut self,
        dt: f64,
        targets: &mut HashMap<String, Target>,
        bus: &EventBus,
    ) {
        let mut resolved_indices = Vec::new();
        for (idx, p) in self.projectiles.iter_mut().enumerate() {
            p.elapsed += dt;

            if p.weapon_class == WeaponClass::Missile {
                if let Some(t) = targets.get(&p.target_id) {
                    let desired = crate::model::heading_between(p.current, t.position);
                    p.heading = turn_toward(p.heading, desired, MISSILE_MAX_TURN_RATE_DPS * dt);
                }
            }

            let rad = p.heading.to_radians();
            let step = p.velocity_mps * dt;
            p.current.x += step * rad.sin();
            p.current.y += step * rad.cos();

            let target_pos = targets.get(&p.target_id).map(|t| t.position);
            let arrived = target_pos.is_some_and(|tp| p.current.distance(tp) <= 1.0);
            let expired = p.elapsed >= p.max_lifetime;

            if arrived || expired {
                resolved_indices.push(idx);
            }
        }

        for idx in resolved_indices.iter().rev() {
            let p = self.projectiles.remove(*idx);
            self.resolve_arrival(&p, targets, bus).await;
        }
    }

    async fn resolve_beam(
        &mut self,
        _now: f64,
        shooter_id: &str,
        target_id: &str,
        distance: f64,
        weapon: &Weapon,
        targets: &mut HashMap<String, Target>,
        bus: &EventBus,
    ) {
        let hit_chance = hit_probability(weapon.accuracy, distance, weapon.weapon_range);
        let hit = roll(hit_chance);
        bus.publish(
            "beam_fired",
            serde_json::json!({ "shooter_id": shooter_id, "target_id": target_id, "hit": hit }),
        )
        .await;
        if hit {
            self.apply_damage_and_report(shooter_id, target_id, weapon.damage, weapon.name.clone(), targets, bus)
                .await;
        } else {
            bus.publish(
                "shot_missed",
                serde_json::json!({ "shooter_id": shooter_id, "target_id": target_id }),
            )
            .await;
        }
    }

    async fn resolve_arrival(
        &mut self,
        p: &Projectile,
        targets: &mut HashMap<String, Target>,
        bus: &EventBus,
    ) {
        let distance = p.origin.distance(p.current);
        let hit_chance = hit_probability(p.accuracy, distance, p.weapon_range);
        let hit = roll(hit_chance);

        if p.weapon_class == WeaponClass::Aoe {
            bus.publish(
                "explosion",
                serde_json::json!({ "position": p.current, "blast_radius": p.blast_radius, "shooter_id": p.shooter_id }),
            )
            .await;
            self.apply_aoe(p, targets, bus).await;
            return;
        }

        if hit {
            self.apply_damage_and_report(&p.shooter_id, &p.target_id, p.damage, String::new(), targets, bus)
                .await;
        } else {
            bus.publish(
                "shot_missed",
                serde_json::json!({ "shooter_id": p.shooter_id, "target_id": p.target_id }),
            )
            .await;
        }
    }

    async fn apply_aoe(&mut self, p: &Projectile, targets: &mut HashMap<String, Target>, bus: &EventBus) {
        if p.blast_radius <= 0.0 {
            // Damage only the impact point: resolve against the intended target if it is there.
            if let Some(t) = targets.get(&p.target_id) {
                if t.position.distance(p.current) <= 1.0 {
                    self.apply_damage_and_report(&p.shooter_id, &p.target_id, p.damage, String::new(), targets, bus)
                        .await;
                }
            }
            return;
        }

        let mut ids: Vec<String> = targets.keys().cloned().collect();
        ids.sort();
        for tid in ids {
            if !self.aoe_self_damage && tid == p.shooter_id {
                continue;
            }
            let Some(t) = targets.get(&tid) else { continue };
            if t.status.is_terminal() {
                continue;
            }
            let d = t.position.distance(p.current);
            if d > p.blast_radius {
                continue;
            }
            let attenuation = 1.0 - (d / p.blast_radius).powi(2);
            let damage = p.damage * attenuation.max(0.0);
            self.apply_damage_and_report(&p.shooter_id, &tid, damage, String::new(), targets, bus)
                .await;
        }
    }

    async fn apply_damage_and_report(
        &self,
        shooter_id: &str,
        target_id: &str,
        amount: f64,
        weapon: String,
        targets: &mut HashMap<String, Target>,
        bus: &EventBus,
    ) {
        let Some(t) = targets.get_mut(target_id) else { return };
        let eliminated = t.apply_damage(amount);
        let remaining = t.health;
        bus.publish(
            "damage",
            serde_json::json!({ "source_id": shooter_id, "target_id": target_id, "amount": amount, "remaining": remaining }),
        )
        .await;
        if eliminated {
            if let Some(shooter) = targets.get_mut(shooter_id) {
                shooter.kills += 1;
            }
            bus.publish(
                "target_eliminated",
                serde_json::json!({ "target_id": target_id, "killer_id": shooter_id, "weapon": weapon }),
            )
            .await;
        }
    }

    /// Clear all transient combat state (engine reset).
    pub fn reset(&mut self) {
        self.cooldowns.clear();
        self.projectiles.clear();
    }
}

fn hit_probability(accuracy: f64, distance: f64, weapon_range: f64) -> f64 {
    if weapon_range <= 0.0 {
        return 0.0;
    }
    let range_factor = (1.0 - distance / weapon_range).clamp(0.2, 1.0);
    (accuracy * range_factor).clamp(0.0, 1.0)
}

fn roll(probability: f64) -> bool {
    if probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return true;
    }
    rand::thread_rng().gen_bool(probability)
}

fn turn_toward(current: f64, desired: f64, max_delta: f64) -> f64 {
    let mut diff = (desired - current) % 360.0;
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff < -180.0 {
        diff += 360.0;
    }
    let delta = diff.clamp(-max_delta, max_delta);
    let mut result = (current + delta) % 360.0;
    if result < 0.0 {
        result += 360.0;
    }
    result
}
