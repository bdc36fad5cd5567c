// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Meshtastic bridge: forwards outbound chat/status text onto a mesh
//! transport, splitting at the device's payload limit.
//!
//! The transport is abstracted behind [`MeshtasticTransport`] since a real
//! Meshtastic link is a serial or TCP device this workspace can't open in
//! tests; a fake implementation exercises the bridge's own logic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use tritium_core::bus::EventBus;
use tritium_wire::meshtastic::send_text;

use crate::backoff::Backoff;
use crate::error::BridgeError;

/// Bus topic carrying outbound chat/status text destined for the mesh.
pub const MESHTASTIC_OUTBOUND_TOPIC: &str = "meshtastic_outbound";

/// A Meshtastic link: serial, TCP, or a test fake.
#[async_trait]
pub trait MeshtasticTransport: Send + Sync {
    async fn connect(&self) -> Result<(), BridgeError>;
    async fn send(&self, chunk: &str) -> Result<(), BridgeError>;
}

/// A Meshtastic link over a TCP-to-serial gateway (e.g. `meshtasticd`'s
/// TCP API), one newline-delimited text chunk per write.
pub struct TcpMeshtasticTransport {
    addr: String,
    stream: tokio::sync::Mutex<Option<tokio::net::TcpStream>>,
}

impl TcpMeshtasticTransport {
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), stream: tokio::sync::Mutex::new(None) }
    }
}

#[async_trait]
impl MeshtasticTransport for TcpMeshtasticTransport {
    async fn connect(&self) -> Result<(), BridgeError> {
        let stream = tokio::net::TcpStream::connect(&self.addr)
            .await
            .map_err(|e| BridgeError::ResourceUnavailable(e.to_string()))?;
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn send(&self, chunk: &str) -> Result<(), BridgeError> {
        use tokio::io::AsyncWriteExt;
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return Err(BridgeError::ResourceUnavailable(self.addr.clone()));
        };
        stream
            .write_all(format!("{chunk}\n").as_bytes())
            .await
            .map_err(|e| BridgeError::TransientIO(e.to_string()))
    }
}

/// Run the bridge until `running` is cleared: subscribes to
/// [`MESHTASTIC_OUTBOUND_TOPIC`] and forwards each message's `text` field,
/// split into device-sized chunks, over `transport`.
pub async fn run(transport: Arc<dyn MeshtasticTransport>, bus: Arc<EventBus>, running: Arc<AtomicBool>) {
    let mut backoff = Backoff::default();

    while running.load(Ordering::Acquire) {
        if let Err(err) = transport.connect().await {
            warn!(error = %err, "meshtastic connect failed, backing off");
            tokio::time::sleep(backoff.next_delay()).await;
            continue;
        }
        backoff.reset();

        let Some((sub_id, mut rx)) = bus.subscribe().await else { return };
        while running.load(Ordering::Acquire) {
            let Some(event) = rx.recv().await else { break };
            if event.topic != MESHTASTIC_OUTBOUND_TOPIC {
                continue;
            }
            let Some(text) = event.data.get("text").and_then(|v| v.as_str()) else { continue };
            for chunk in send_text(text) {
                if let Err(err) = transport.send(&chunk).await {
                    warn!(error = %err, "meshtastic send failed, reconnecting");
                    bus.unsubscribe(sub_id).await;
                    tokio::time::sleep(backoff.next_delay()).await;
                    continue;
                }
            }
        }
        bus.unsubscribe(sub_id).await;
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MeshtasticTransport for FakeTransport {
        async fn connect(&self) -> Result<(), BridgeError> {
            Ok(())
        }
        async fn send(&self, chunk: &str) -> Result<(), BridgeError> {
            self.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(chunk.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn forwards_outbound_text_as_chunks() {
        let transport = Arc::new(FakeTransport { sent: Mutex::new(Vec::new()) });
        let bus = Arc::new(EventBus::new());
        let running = Arc::new(AtomicBool::new(true));

        let bus_clone = bus.clone();
        let running_clone = running.clone();
        let transport_clone: Arc<dyn MeshtasticTransport> = transport.clone();
        let handle = tokio::spawn(run(transport_clone, bus_clone, running_clone));

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        bus.publish(MESHTASTIC_OUTBOUND_TOPIC, serde_json::json!({"text": "hold position"})).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        running.store(false, Ordering::Release);
        bus.shutdown();
        let _ = tokio::time::timeout(std::time::Duration::from_millis(200), handle).await;

        let sent = transport.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        assert_eq!(sent.as_slice(), ["hold position"]);
    }
}
