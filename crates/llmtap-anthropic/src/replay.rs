//! Replay override resolution
//!
//! A cached override is an opaque serialized payload with no up-front
//! discriminator guarantee, so this is the one place ordered schema
//! probing survives: try the complete `Message` shape first, then the
//! raw stream-fragment shape. Everything on the live stream path
//! dispatches on the tagged discriminator instead.

use crate::wire::{Message, StreamEvent};

/// A deserialized replay override, in the shape the normalizer expects
#[derive(Debug, Clone)]
pub enum ReplayPayload {
    /// A complete non-streamed response
    Message(Box<Message>),

    /// A single raw stream fragment
    Fragment(Box<StreamEvent>),
}

/// Deserialize a cached override against the known response schemas,
/// first match wins. `None` means the override fits nothing and the
/// call must fail closed (no live provider call, null result).
pub fn resolve_override(serialized: &str) -> Option<ReplayPayload> {
    if let Ok(message) = serde_json::from_str::<Message>(serialized) {
        return Some(ReplayPayload::Message(Box::new(message)));
    }

    if let Ok(fragment) = serde_json::from_str::<StreamEvent>(serialized) {
        // serde(other) would happily classify arbitrary tagged JSON as
        // Unknown; that is a validation failure, not a fragment.
        if !matches!(fragment, StreamEvent::Unknown) {
            return Some(ReplayPayload::Fragment(Box::new(fragment)));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_schema_matches_first() {
        let serialized = serde_json::json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-5",
            "content": [{"type": "text", "text": "cached"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 3, "output_tokens": 2}
        })
        .to_string();

        match resolve_override(&serialized) {
            Some(ReplayPayload::Message(message)) => assert_eq!(message.id, "msg_01"),
            other => panic!("expected message payload, got {:?}", other),
        }
    }

    #[test]
    fn fragment_schema_matches_second() {
        let serialized = serde_json::json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": "cached"}
        })
        .to_string();

        match resolve_override(&serialized) {
            Some(ReplayPayload::Fragment(fragment)) => {
                assert!(matches!(*fragment, StreamEvent::ContentBlockDelta { .. }));
            }
            other => panic!("expected fragment payload, got {:?}", other),
        }
    }

    #[test]
    fn unmatched_payload_resolves_to_none() {
        assert!(resolve_override("not json").is_none());
        assert!(resolve_override("{\"type\": \"something_else\"}").is_none());
        assert!(resolve_override("{\"foo\": 1}").is_none());
    }
}
