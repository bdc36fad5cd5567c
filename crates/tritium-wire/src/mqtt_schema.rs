// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The MQTT telemetry JSON schema published by fleet robots and consumed by
//! the MQTT bridge on topic `<site>/telemetry/<robot_id>`.

use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// One telemetry sample as published to MQTT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub robot_id: String,
    pub lat: f64,
    pub lng: f64,
    pub heading: f64,
    pub speed: f64,
    pub battery: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

impl TelemetrySample {
    /// Topic a sample publishes to under the given site prefix.
    #[must_use]
    pub fn topic(&self, site: &str) -> String {
        format!("{site}/telemetry/{}", self.robot_id)
    }

    /// # Errors
    /// Returns [`WireError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Json)
    }

    /// # Errors
    /// Returns [`WireError::Json`] if the payload doesn't match the schema.
    pub fn from_json(payload: &str) -> Result<Self, WireError> {
        serde_json::from_str(payload).map_err(WireError::Json)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let sample = TelemetrySample {
            robot_id: "rover-1".to_string(),
            lat: 37.0,
            lng: -122.0,
            heading: 90.0,
            speed: 1.2,
            battery: 0.8,
            status: "active".to_string(),
            alt: Some(10.0),
        };
        let json = sample.to_json().expect("encode");
        let decoded = TelemetrySample::from_json(&json).expect("decode");
        assert_eq!(decoded, sample);
    }

    #[test]
    fn topic_uses_site_prefix_and_robot_id() {
        let sample = TelemetrySample {
            robot_id: "rover-1".to_string(),
            lat: 0.0,
            lng: 0.0,
            heading: 0.0,
            speed: 0.0,
            battery: 1.0,
            status: "idle".to_string(),
            alt: None,
        };
        assert_eq!(sample.topic("tritium"), "tritium/telemetry/rover-1");
    }
}
