// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! TAK/CoT-over-TCP bridge: streams a CoT SA event per live target at a
//! configured cadence, and — when `TakBridgeConfig::final_event_on_elimination`
//! is set (the default) — sends one final event with `stale = now` the
//! instant a target is eliminated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use tritium_core::bus::EventBus;
use tritium_core::engine::SimulationEngine;
use tritium_core::model::Target;
use tritium_wire::cot::CotEvent;
use tritium_wire::geo::GeoReference;

use crate::backoff::Backoff;

/// TAK/CoT TCP bridge settings.
#[derive(Debug, Clone)]
pub struct TakBridgeConfig {
    pub host: String,
    pub port: u16,
    pub publish_interval_s: f64,
    pub geo: GeoReference,
    /// Send one final CoT event with `stale = now` on `target_eliminated`,
    /// so the TAK peer doesn't wait out the normal stale window for a unit
    /// that's already gone.
    pub final_event_on_elimination: bool,
}

/// Supplies the current set of targets to stream; decouples this bridge
/// from any particular engine wiring so it can be driven by a fake in tests.
#[async_trait]
pub trait TargetSource: Send + Sync {
    async fn snapshot(&self) -> Vec<Target>;
}

#[async_trait]
impl TargetSource for SimulationEngine {
    async fn snapshot(&self) -> Vec<Target> {
        self.get_targets().await
    }
}

/// Encode a routine periodic snapshot event, staling out after the normal
/// CoT window.
fn encode_event(target: &Target, geo: &GeoReference, now: chrono::DateTime<Utc>) -> Option<String> {
    let (lat, lng, alt) = geo.local_to_latlng(target.position.x, target.position.y, 0.0);
    let point = tritium_wire::cot::CotPoint::new(lat, lng, alt);
    CotEvent::from_target(target, point, now).to_xml().ok()
}

/// Encode the terminal event sent on elimination: `stale` is forced to `now`
/// so the TAK peer drops the icon immediately instead of waiting out the
/// normal stale window.
fn encode_final_event(target: &Target, geo: &GeoReference, now: chrono::DateTime<Utc>) -> Option<String> {
    let (lat, lng, alt) = geo.local_to_latlng(target.position.x, target.position.y, 0.0);
    let point = tritium_wire::cot::CotPoint::new(lat, lng, alt);
    CotEvent::from_target_with_stale(target, point, now, now).to_xml().ok()
}

async fn send_snapshot(stream: &mut TcpStream, targets: &[Target], geo: &GeoReference) -> Result<(), std::io::Error> {
    let now = Utc::now();
    for target in targets {
        if target.status.is_terminal() {
            continue;
        }
        if let Some(xml) = encode_event(target, geo, now) {
            stream.write_all(xml.as_bytes()).await?;
        }
    }
    Ok(())
}

/// Run the TAK bridge until `running` is cleared.
pub async fn run(config: TakBridgeConfig, source: Arc<dyn TargetSource>, bus: Arc<EventBus>, running: Arc<AtomicBool>) {
    let mut backoff = Backoff::default();
    let interval = Duration::from_secs_f64(config.publish_interval_s.max(0.1));

    while running.load(Ordering::Acquire) {
        let addr = format!("{}:{}", config.host, config.port);
        let stream = match TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, addr = %addr, "tak bridge connect failed, backing off");
                tokio::time::sleep(backoff.next_delay()).await;
                continue;
            }
        };
        info!(addr = %addr, "tak bridge connected");
        backoff.reset();

        let (elim_id, mut elim_rx) = match bus.subscribe().await {
            Some(pair) => pair,
            None => return,
        };

        let mut stream = stream;
        let mut ticker = tokio::time::interval(interval);
        let mut broken = false;
        while running.load(Ordering::Acquire) && !broken {
            tokio::select! {
                _ = ticker.tick() => {
                    let targets = source.snapshot().await;
                    if let Err(err) = send_snapshot(&mut stream, &targets, &config.geo).await {
                        warn!(error = %err, "tak bridge write failed, reconnecting");
                        broken = true;
                    }
                }
                event = elim_rx.recv() => {
                    let Some(event) = event else { break };
                    if event.topic == "target_eliminated" && config.final_event_on_elimination {
                        if let Some(id) = event.data.get("target_id").and_then(|v| v.as_str()) {
                            if let Some(target) = source.snapshot().await.into_iter().find(|t| t.target_id == id) {
                                let now = Utc::now();
                                if let Some(xml) = encode_final_event(&target, &config.geo, now) {
                                    if let Err(err) = stream.write_all(xml.as_bytes()).await {
                                        warn!(error = %err, "tak bridge final-event write failed");
                                        broken = true;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        bus.unsubscribe(elim_id).await;
        debug!("tak bridge reconnect loop sleeping");
        if running.load(Ordering::Acquire) {
            tokio::time::sleep(backoff.next_delay()).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tritium_core::model::{Alliance, AssetType, Position};

    #[test]
    fn encode_event_skips_nothing_for_a_live_target() {
        let target = Target::spawn("t-1", "Scout", Alliance::Friendly, AssetType::Rover, Position::new(0.0, 0.0), 0.0);
        let geo = GeoReference::new(37.0, -122.0, 0.0);
        let xml = encode_event(&target, &geo, Utc::now()).expect("encode");
        assert!(xml.contains("t-1"));
    }

    #[test]
    fn final_event_stales_immediately_unlike_a_routine_snapshot() {
        let target = Target::spawn("t-2", "Scout", Alliance::Hostile, AssetType::HostilePerson, Position::new(0.0, 0.0), 0.0);
        let geo = GeoReference::new(37.0, -122.0, 0.0);
        let now = Utc::now();

        let routine = encode_event(&target, &geo, now).expect("encode");
        let routine_parsed = CotEvent::parse(&routine).expect("decode");
        assert!(routine_parsed.stale > now, "routine snapshot should stale out later");

        let final_event = encode_final_event(&target, &geo, now).expect("encode");
        let final_parsed = CotEvent::parse(&final_event).expect("decode");
        assert!(
            (final_parsed.stale - now).num_milliseconds().abs() < 1,
            "final event should stale immediately, got {:?} vs {now:?}",
            final_parsed.stale
        );
    }
}
