// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Meshtastic text-message codec: outbound messages are split at the
//! device's payload limit rather than rejected outright.

use crate::error::WireError;

/// Meshtastic's maximum text payload in bytes.
pub const MESHTASTIC_MAX_TEXT: usize = 200;

/// Split `text` into chunks that each fit within [`MESHTASTIC_MAX_TEXT`]
/// bytes, breaking on char boundaries only.
#[must_use]
pub fn send_text(text: &str) -> Vec<String> {
    if text.len() <= MESHTASTIC_MAX_TEXT {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if current.len() + ch.len_utf8() > MESHTASTIC_MAX_TEXT {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Validate an inbound Meshtastic text payload, rejecting anything the
/// device itself could never have sent.
///
/// # Errors
/// Returns [`WireError::MeshtasticTooLong`] if `payload` exceeds the limit.
pub fn receive_text(payload: &str) -> Result<&str, WireError> {
    if payload.len() > MESHTASTIC_MAX_TEXT {
        return Err(WireError::MeshtasticTooLong { len: payload.len(), limit: MESHTASTIC_MAX_TEXT });
    }
    Ok(payload)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(send_text("hello"), vec!["hello".to_string()]);
    }

    #[test]
    fn long_text_splits_at_the_limit() {
        let text = "a".repeat(450);
        let chunks = send_text(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= MESHTASTIC_MAX_TEXT));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn receive_text_rejects_oversized_payload() {
        let payload = "a".repeat(MESHTASTIC_MAX_TEXT + 1);
        assert!(receive_text(&payload).is_err());
    }
}
