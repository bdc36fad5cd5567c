// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire-format error taxonomy; maps onto the `ProtocolError` kind.

use thiserror::Error;

/// Errors from encoding/decoding any wire format this crate handles.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed xml: {0}")]
    Xml(String),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown cot type: {0}")]
    UnknownCotType(String),

    #[error("message exceeds meshtastic text limit ({len} > {limit})")]
    MeshtasticTooLong { len: usize, limit: usize },

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
