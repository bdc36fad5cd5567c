// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Long-lived reconnect/backoff bridge workers translating between the
//! `tritium-core` EventBus and external transports.

pub mod backoff;
pub mod error;
pub mod meshtastic;
pub mod mqtt;
pub mod tak;

pub use error::BridgeError;
