// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! MQTT bridge: subscribes to `<site>/telemetry/+`, decodes each payload as a
//! [`tritium_wire::mqtt_schema::TelemetrySample`], and republishes it on the
//! engine's `EventBus` under the `mqtt_telemetry` topic for the tracker to
//! fold in as an `mqtt_`-prefixed external target.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event as MqttEvent, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};
use tritium_core::bus::EventBus;
use tritium_wire::mqtt_schema::TelemetrySample;

use crate::backoff::Backoff;

/// MQTT broker connection settings for the bridge.
#[derive(Debug, Clone)]
pub struct MqttBridgeConfig {
    pub host: String,
    pub port: u16,
    pub site: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Bus topic telemetry decoded off MQTT is republished under.
pub const MQTT_TELEMETRY_TOPIC: &str = "mqtt_telemetry";

/// The `<site>/telemetry/+` subscription filter for a site.
#[must_use]
pub fn telemetry_filter(site: &str) -> String {
    format!("{site}/telemetry/+")
}

/// Decode an inbound MQTT payload and, on success, the bus event payload to
/// publish for it. Malformed payloads are logged and dropped rather than
/// killing the connection.
fn decode_payload(payload: &[u8]) -> Option<serde_json::Value> {
    let text = std::str::from_utf8(payload).ok()?;
    match TelemetrySample::from_json(text) {
        Ok(sample) => serde_json::to_value(sample).ok(),
        Err(err) => {
            warn!(error = %err, "dropping malformed mqtt telemetry payload");
            None
        }
    }
}

/// Run the MQTT bridge until `running` is cleared. Reconnects with
/// exponential backoff on any broker-level error.
pub async fn run(config: MqttBridgeConfig, bus: Arc<EventBus>, running: Arc<AtomicBool>) {
    let mut backoff = Backoff::default();

    while running.load(Ordering::Acquire) {
        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(15));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user.clone(), pass.clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 64);
        let filter = telemetry_filter(&config.site);
        if let Err(err) = client.subscribe(&filter, QoS::AtLeastOnce).await {
            warn!(error = %err, "mqtt subscribe failed, backing off");
            tokio::time::sleep(backoff.next_delay()).await;
            continue;
        }

        info!(filter = %filter, "mqtt bridge connected");
        backoff.reset();

        loop {
            if !running.load(Ordering::Acquire) {
                return;
            }
            match event_loop.poll().await {
                Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                    if let Some(value) = decode_payload(&publish.payload) {
                        bus.publish(MQTT_TELEMETRY_TOPIC, value).await;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "mqtt event loop error, reconnecting");
                    break;
                }
            }
        }

        debug!("mqtt bridge reconnect loop sleeping");
        tokio::time::sleep(backoff.next_delay()).await;
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_filter_is_a_single_level_wildcard() {
        assert_eq!(telemetry_filter("tritium"), "tritium/telemetry/+");
    }

    #[test]
    fn decode_payload_rejects_invalid_json() {
        assert!(decode_payload(b"not json").is_none());
    }

    #[test]
    fn decode_payload_accepts_a_valid_sample() {
        let sample = TelemetrySample {
            robot_id: "rover-1".to_string(),
            lat: 1.0,
            lng: 2.0,
            heading: 0.0,
            speed: 0.0,
            battery: 1.0,
            status: "idle".to_string(),
            alt: None,
        };
        let json = sample.to_json().expect("encode");
        let value = decode_payload(json.as_bytes()).expect("decode");
        assert_eq!(value["robot_id"], "rover-1");
    }
}
