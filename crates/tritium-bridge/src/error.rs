// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bridge error taxonomy: the `TransientIO`/`ResourceUnavailable` kinds of
//! the error handling design, plus wire decode failures forwarded from
//! `tritium-wire`.

use thiserror::Error;
use tritium_wire::WireError;

/// Errors raised by a bridge worker.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A transport call failed in a way retrying may resolve (dropped
    /// connection, write timeout).
    #[error("transient io error: {0}")]
    TransientIO(String),

    /// The remote peer or broker is unreachable/refusing connections.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// A message on the wire didn't decode.
    #[error("protocol error: {0}")]
    Protocol(#[from] WireError),

    /// Anything else a worker can't recover from without a restart.
    #[error("internal bridge error: {0}")]
    Internal(String),
}
