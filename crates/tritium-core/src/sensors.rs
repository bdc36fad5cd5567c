// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Proximity detectors with debounce, grounded in
//! `original_source/src/engine/simulation/sensors.py`.

use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::model::{Position, Target};

/// Sensor device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Motion,
    Door,
    Tripwire,
}

/// A single sensor and its debounced activation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorDevice {
    pub sensor_id: String,
    pub name: String,
    pub sensor_type: SensorType,
    pub position: Position,
    pub radius: f64,
    pub active: bool,
    pub last_triggered_mono: f64,
    pub triggered_by: String,
}

/// Minimum time between activations for the same sensor.
pub const DEBOUNCE_S: f64 = 3.0;

/// Tick-driven sensor network.
#[derive(Default)]
pub struct SensorSimulator {
    sensors: Vec<SensorDevice>,
}

impl SensorSimulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sensor(
        &mut self,
        sensor_id: impl Into<String>,
        name: impl Into<String>,
        sensor_type: SensorType,
        position: Position,
        radius: f64,
    ) {
        self.sensors.push(SensorDevice {
            sensor_id: sensor_id.into(),
            name: name.into(),
            sensor_type,
            position,
            radius,
            active: false,
            last_triggered_mono: f64::NEG_INFINITY,
            triggered_by: String::new(),
        });
    }

    #[must_use]
    pub fn sensors(&self) -> &[SensorDevice] {
        &self.sensors
    }

    /// Check all sensors against target positions; `now` is simulation
    /// monotonic time in seconds.
    pub async fn tick(&mut self, now: f64, targets: &[Target], bus: &EventBus) {
        for sensor in &mut self.sensors {
            let nearby: Vec<&Target> = targets
                .iter()
                .filter(|t| !t.status.is_terminal())
                .filter(|t| t.position.distance(sensor.position) <= sensor.radius)
                .collect();

            if let Some(first) = nearby.first() {
                if !sensor.active && now - sensor.last_triggered_mono >= DEBOUNCE_S {
                    sensor.active = true;
                    sensor.last_triggered_mono = now;
                    sensor.triggered_by.clone_from(&first.name);
                    bus.publish(
                        "sensor_triggered",
                        serde_json::json!({
                            "sensor_id": sensor.sensor_id, "name": sensor.name, "type": sensor.sensor_type,
                            "triggered_by": first.name, "target_id": first.target_id, "position": sensor.position,
                        }),
                    )
                    .await;
                }
            } else if sensor.active {
                sensor.active = false;
                bus.publish(
                    "sensor_cleared",
                    serde_json::json!({ "sensor_id": sensor.sensor_id, "name": sensor.name, "type": sensor.sensor_type, "position": sensor.position }),
                )
                .await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Alliance, AssetType};

    fn hostile_at(pos: Position) -> Target {
        Target::spawn("h1", "Hostile", Alliance::Hostile, AssetType::HostilePerson, pos, 0.0)
    }

    #[tokio::test]
    async fn activation_and_clear_emit_events() {
        let bus = EventBus::new();
        let (_id, mut rx) = bus.subscribe().await.expect("open");
        let mut sim = SensorSimulator::new();
        sim.add_sensor("s1", "Door 1", SensorType::Door, Position::new(0.0, 0.0), 3.0);

        let near = vec![hostile_at(Position::new(1.0, 0.0))];
        sim.tick(0.0, &near, &bus).await;
        let ev = rx.recv().await.expect("sensor_triggered");
        assert_eq!(ev.topic, "sensor_triggered");

        sim.tick(10.0, &[], &bus).await;
        let ev = rx.recv().await.expect("sensor_cleared");
        assert_eq!(ev.topic, "sensor_cleared");
    }

    #[tokio::test]
    async fn debounce_blocks_retrigger_within_window() {
        let bus = EventBus::new();
        let (_id, mut rx) = bus.subscribe().await.expect("open");
        let mut sim = SensorSimulator::new();
        sim.add_sensor("s1", "Motion 1", SensorType::Motion, Position::new(0.0, 0.0), 3.0);
        let near = vec![hostile_at(Position::new(1.0, 0.0))];
        sim.tick(0.0, &near, &bus).await;
        rx.recv().await.expect("first trigger");
        sim.tick(0.5, &[], &bus).await; // clears
        rx.recv().await.expect("cleared");
        sim.tick(1.0, &near, &bus).await; // within debounce window of last_triggered (t=0)
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn terminal_status_targets_are_ignored() {
        let bus = EventBus::new();
        let mut sim = SensorSimulator::new();
        sim.add_sensor("s1", "Door 1", SensorType::Door, Position::new(0.0, 0.0), 3.0);
        let mut t = hostile_at(Position::new(1.0, 0.0));
        t.status = crate::model::Status::Eliminated;
        sim.tick(0.0, &[t], &bus).await;
        assert!(!sim.sensors()[0].active);
    }
}
