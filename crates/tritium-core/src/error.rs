// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine error taxonomy.
//!
//! Malformed or out-of-FSM-state commands are `InvalidRequest`; everything
//! else the engine itself can fail at is `Internal`. Bridges and the gateway
//! have their own error enums for `TransientIO`/`ResourceUnavailable`/
//! `ProtocolError`.

use thiserror::Error;

/// Errors raised by engine write-path operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The command is malformed or not valid in the engine's current FSM state.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No target exists with the given id.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// A subsystem's tick panicked or returned an internal invariant violation.
    ///
    /// The engine tick must never crash; callers observe this via the
    /// `component_error` event rather than this variant propagating out of
    /// `tick()`.
    #[error("internal error in {component}: {detail}")]
    Internal {
        /// Name of the subsystem that failed.
        component: String,
        /// Human-readable detail.
        detail: String,
    },
}
