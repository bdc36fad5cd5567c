// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Environment-variable-driven settings for TRITIUM-SC services.
//!
//! Case-insensitive lookups mirror POSIX `os.environ` case-folding;
//! unknown variables are ignored.

use std::collections::HashMap;
use std::env;

use thiserror::Error;

/// Errors produced while loading settings from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// MQTT broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub site: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// InfluxDB telemetry sink settings.
#[derive(Debug, Clone)]
pub struct InfluxSettings {
    pub url: String,
    pub token: Option<String>,
    pub org: String,
    pub bucket: String,
}

/// Amy (TAK/CoT) bridge settings.
#[derive(Debug, Clone)]
pub struct AmySettings {
    pub cot_url: String,
    pub publish_interval_s: f64,
    pub stale_seconds: f64,
}

/// Meshtastic bridge settings.
#[derive(Debug, Clone)]
pub struct MeshtasticSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub mqtt: MqttSettings,
    pub influx: InfluxSettings,
    pub amy: AmySettings,
    pub meshtastic: MeshtasticSettings,
    pub map_center_lat: f64,
    pub map_center_lng: f64,
    pub map_center_alt: f64,
    pub simulation_enabled: bool,
    pub detection_confidence: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            mqtt: MqttSettings {
                host: "localhost".to_string(),
                port: 1883,
                site: "tritium".to_string(),
                username: None,
                password: None,
            },
            influx: InfluxSettings {
                url: "http://localhost:8086".to_string(),
                token: None,
                org: "tritium".to_string(),
                bucket: "telemetry".to_string(),
            },
            amy: AmySettings {
                cot_url: "tcp://localhost:8087".to_string(),
                publish_interval_s: 3.0,
                stale_seconds: 60.0,
            },
            meshtastic: MeshtasticSettings { enabled: false, host: "localhost".to_string(), port: 4403 },
            map_center_lat: 0.0,
            map_center_lng: 0.0,
            map_center_alt: 0.0,
            simulation_enabled: true,
            detection_confidence: 0.6,
        }
    }
}

impl Settings {
    /// Load settings from `std::env::vars()`, case-insensitively, falling
    /// back to defaults for anything unset. Unknown variables are ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars().map(|(k, v)| (k.to_uppercase(), v)).collect();
        Self::from_map(&vars)
    }

    fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(v) = vars.get("HOST") {
            settings.host.clone_from(v);
        }
        if let Some(v) = vars.get("PORT") {
            settings.port = parse(v, "PORT")?;
        }

        if let Some(v) = vars.get("MQTT_HOST") {
            settings.mqtt.host.clone_from(v);
        }
        if let Some(v) = vars.get("MQTT_PORT") {
            settings.mqtt.port = parse(v, "MQTT_PORT")?;
        }
        if let Some(v) = vars.get("MQTT_SITE") {
            settings.mqtt.site.clone_from(v);
        }
        settings.mqtt.username = vars.get("MQTT_USERNAME").cloned();
        settings.mqtt.password = vars.get("MQTT_PASSWORD").cloned();

        if let Some(v) = vars.get("INFLUX_URL") {
            settings.influx.url.clone_from(v);
        }
        settings.influx.token = vars.get("INFLUX_TOKEN").cloned();
        if let Some(v) = vars.get("INFLUX_ORG") {
            settings.influx.org.clone_from(v);
        }
        if let Some(v) = vars.get("INFLUX_BUCKET") {
            settings.influx.bucket.clone_from(v);
        }

        if let Some(v) = vars.get("AMY_COT_URL") {
            settings.amy.cot_url.clone_from(v);
        }
        if let Some(v) = vars.get("AMY_PUBLISH_INTERVAL_S") {
            settings.amy.publish_interval_s = parse(v, "AMY_PUBLISH_INTERVAL_S")?;
        }
        if let Some(v) = vars.get("AMY_STALE_SECONDS") {
            settings.amy.stale_seconds = parse(v, "AMY_STALE_SECONDS")?;
        }

        if let Some(v) = vars.get("MESHTASTIC_ENABLED") {
            settings.meshtastic.enabled = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = vars.get("MESHTASTIC_HOST") {
            settings.meshtastic.host.clone_from(v);
        }
        if let Some(v) = vars.get("MESHTASTIC_PORT") {
            settings.meshtastic.port = parse(v, "MESHTASTIC_PORT")?;
        }

        if let Some(v) = vars.get("MAP_CENTER_LAT") {
            settings.map_center_lat = parse(v, "MAP_CENTER_LAT")?;
        }
        if let Some(v) = vars.get("MAP_CENTER_LNG") {
            settings.map_center_lng = parse(v, "MAP_CENTER_LNG")?;
        }
        if let Some(v) = vars.get("MAP_CENTER_ALT") {
            settings.map_center_alt = parse(v, "MAP_CENTER_ALT")?;
        }

        if let Some(v) = vars.get("SIMULATION_ENABLED") {
            settings.simulation_enabled = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = vars.get("DETECTION_CONFIDENCE") {
            settings.detection_confidence = parse(v, "DETECTION_CONFIDENCE")?;
        }

        Ok(settings)
    }

    #[must_use]
    pub fn map_center(&self) -> (f64, f64, f64) {
        (self.map_center_lat, self.map_center_lng, self.map_center_alt)
    }
}

fn parse<T: std::str::FromStr>(value: &str, name: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber { name, value: value.to_string() })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_when_no_vars_set() {
        let settings = Settings::from_map(&HashMap::new()).expect("defaults");
        assert_eq!(settings.port, 8080);
        assert!(settings.simulation_enabled);
    }

    #[test]
    fn recognized_vars_are_case_insensitive() {
        let mut vars = HashMap::new();
        vars.insert("PORT".to_string(), "9090".to_string());
        vars.insert("MAP_CENTER_LAT".to_string(), "40.0".to_string());
        let settings = Settings::from_map(&vars).expect("settings");
        assert_eq!(settings.port, 9090);
        assert!((settings.map_center_lat - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_vars_are_ignored() {
        let mut vars = HashMap::new();
        vars.insert("SOME_RANDOM_VAR".to_string(), "whatever".to_string());
        let settings = Settings::from_map(&vars).expect("settings");
        assert_eq!(settings.host, Settings::default().host);
    }

    #[test]
    fn meshtastic_is_disabled_by_default_and_opt_in() {
        let defaults = Settings::from_map(&HashMap::new()).expect("defaults");
        assert!(!defaults.meshtastic.enabled);

        let mut vars = HashMap::new();
        vars.insert("MESHTASTIC_ENABLED".to_string(), "true".to_string());
        vars.insert("MESHTASTIC_HOST".to_string(), "mesh.local".to_string());
        let settings = Settings::from_map(&vars).expect("settings");
        assert!(settings.meshtastic.enabled);
        assert_eq!(settings.meshtastic.host, "mesh.local");
    }

    #[test]
    fn invalid_number_is_a_config_error() {
        let mut vars = HashMap::new();
        vars.insert("PORT".to_string(), "not-a-number".to_string());
        assert!(Settings::from_map(&vars).is_err());
    }
}
