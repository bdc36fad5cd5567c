// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! TRITIUM-SC daemon.
//!
//! Wires a `SimulationEngine` tick loop, the MQTT and TAK bridge workers,
//! and the telemetry gateway together behind one `EventBus`.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tritium_bridge::meshtastic::{self, MeshtasticTransport, TcpMeshtasticTransport};
use tritium_bridge::mqtt::{self, MqttBridgeConfig};
use tritium_bridge::tak::{self, TakBridgeConfig};
use tritium_config::Settings;
use tritium_core::engine::SimulationEngine;
use tritium_core::scenario::ScenarioLoader;
use tritium_gateway::{router, AppState, ConnectionManager};
use tritium_wire::geo::GeoReference;

#[derive(Parser, Debug)]
#[command(author, version, about = "TRITIUM-SC tactical simulation daemon")]
struct Args {
    /// HTTP/WS listen address, overrides `HOST`/`PORT`.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Directory of scenario JSON files.
    #[arg(long, default_value = "scenarios/battle")]
    scenario_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?)).init();

    let settings = Settings::from_env().context("load settings from environment")?;
    info!(host = %args.host, port = args.port, "starting tritiumd");

    let engine = SimulationEngine::new();
    engine.start();

    let running = Arc::new(AtomicBool::new(true));

    let (tak_host, tak_port) = split_host_port(&settings.amy.cot_url);
    let tak_config = TakBridgeConfig {
        host: tak_host,
        port: tak_port,
        publish_interval_s: settings.amy.publish_interval_s,
        geo: GeoReference::new(settings.map_center_lat, settings.map_center_lng, settings.map_center_alt),
        final_event_on_elimination: true,
    };
    let tak_engine: Arc<dyn tak::TargetSource> = Arc::new(engine.clone());
    tokio::spawn(tak::run(tak_config, tak_engine, engine.bus(), running.clone()));

    let mqtt_config = MqttBridgeConfig {
        host: settings.mqtt.host.clone(),
        port: settings.mqtt.port,
        site: settings.mqtt.site.clone(),
        client_id: "tritiumd".to_string(),
        username: settings.mqtt.username.clone(),
        password: settings.mqtt.password.clone(),
    };
    tokio::spawn(mqtt::run(mqtt_config, engine.bus(), running.clone()));

    if settings.meshtastic.enabled {
        let transport: Arc<dyn MeshtasticTransport> =
            Arc::new(TcpMeshtasticTransport::new(format!("{}:{}", settings.meshtastic.host, settings.meshtastic.port)));
        tokio::spawn(meshtastic::run(transport, engine.bus(), running.clone()));
    }

    let state = AppState {
        engine: engine.clone(),
        connections: Arc::new(ConnectionManager::new()),
        scenarios: Arc::new(ScenarioLoader::new(args.scenario_dir)),
        default_map_center: settings.map_center(),
    };
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse().context("parse listen address")?;
    let listener = tokio::net::TcpListener::bind(addr).await.context("bind gateway listener")?;
    info!(addr = %addr, "gateway listening");
    axum::serve(listener, app).await.context("gateway server failed")?;

    Ok(())
}

fn split_host_port(url: &str) -> (String, u16) {
    let without_scheme = url.split("://").next_back().unwrap_or(url);
    match without_scheme.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(8087)),
        None => (without_scheme.to_string(), 8087),
    }
}
