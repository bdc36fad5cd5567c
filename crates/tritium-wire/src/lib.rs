// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire formats shared by every TRITIUM-SC bridge: CoT XML, the MQTT
//! telemetry JSON schema, the Meshtastic text codec, and GeoChat (spec
//! §4.15).

pub mod cot;
pub mod error;
pub mod geo;
pub mod geochat;
pub mod meshtastic;
pub mod mqtt_schema;

pub use cot::{CotEvent, CotPoint};
pub use error::WireError;
pub use geo::GeoReference;
