//! Anthropic Messages API wire types
//!
//! Provider-shape knowledge lives here: the non-streaming `Message`
//! response and the SSE fragment family. Fragments are internally
//! tagged on `type` so classification is direct dispatch; anything the
//! provider adds later lands in `Unknown` instead of failing the
//! caller's stream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token usage reported on responses and `message_start` fragments
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A content block in a completed message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
}

/// A complete (non-streamed) message response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub role: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

/// Message header carried by a `message_start` fragment
///
/// Content is always empty at stream start; text accumulates through
/// deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub role: String,
    pub model: String,
    pub usage: Usage,
}

/// Content block header carried by a `content_block_start` fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String },
}

impl StreamContentBlock {
    /// Wire name of the block sub-type
    pub fn block_type(&self) -> &'static str {
        match self {
            StreamContentBlock::Text { .. } => "text",
            StreamContentBlock::ToolUse { .. } => "tool_use",
        }
    }
}

/// Incremental payload carried by a `content_block_delta` fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

/// Body of a `message_delta` fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
}

/// Usage carried by a `message_delta` fragment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MessageDeltaUsage {
    pub output_tokens: u32,
}

/// One incremental unit of a streamed response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: StreamMessage,
    },
    ContentBlockStart {
        index: u32,
        content_block: StreamContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: StreamDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        usage: MessageDeltaUsage,
    },
    MessageStop,
    #[serde(other)]
    Unknown,
}

/// Arguments for a Messages `create` call
///
/// Known sampling fields are typed; everything else rides in the
/// flattened `extra` map so the interceptor forwards arguments it does
/// not understand untouched. The optional `session` key is consumed by
/// the interceptor via [`CreateParams::take_session`] and never
/// reaches the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateParams {
    pub model: String,
    pub messages: Value,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CreateParams {
    /// Create params for a model and message list
    pub fn new(model: impl Into<String>, messages: Value) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: 4096,
            system: None,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            stream: None,
            extra: Map::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Attach a session identifier. The interceptor strips it before
    /// any forwarding.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.extra
            .insert("session".to_string(), Value::String(session.into()));
        self
    }

    /// Set an arbitrary provider-opaque argument
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Remove and return the session identifier, if present
    pub fn take_session(&mut self) -> Option<String> {
        match self.extra.remove("session") {
            Some(Value::String(session)) => Some(session),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }

    /// Canonical JSON rendering of the call arguments, used both for
    /// replay-key derivation and as the event's `params`. Call after
    /// `take_session` so the session never influences the key.
    pub fn kwargs_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_events_deserialize_by_discriminator() {
        let data = json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": "Hello"}
        });

        let event: StreamEvent = serde_json::from_value(data).unwrap();
        match event {
            StreamEvent::ContentBlockDelta {
                delta: StreamDelta::TextDelta { text },
                ..
            } => assert_eq!(text, "Hello"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unrecognized_discriminator_maps_to_unknown() {
        let data = json!({"type": "ping"});
        let event: StreamEvent = serde_json::from_value(data).unwrap();
        assert!(matches!(event, StreamEvent::Unknown));
    }

    #[test]
    fn message_round_trips() {
        let data = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-5",
            "content": [
                {"type": "text", "text": "Hi there"},
                {"type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": {"city": "Paris"}}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 5}
        });

        let message: Message = serde_json::from_value(data.clone()).unwrap();
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.usage.input_tokens, 12);

        let back = serde_json::to_value(&message).unwrap();
        assert_eq!(back["content"][1]["name"], "get_weather");
    }

    #[test]
    fn take_session_strips_without_touching_other_kwargs() {
        let mut params = CreateParams::new("claude-sonnet-4-5", json!([{"role": "user", "content": "hi"}]))
            .with_session("sess-42")
            .with_extra("metadata", json!({"user_id": "u1"}));

        assert_eq!(params.take_session().as_deref(), Some("sess-42"));
        assert_eq!(params.take_session(), None);
        assert!(params.extra.contains_key("metadata"));

        let kwargs = params.kwargs_json().unwrap();
        assert!(!kwargs.contains("session"));
        assert!(kwargs.contains("metadata"));
    }

    #[test]
    fn kwargs_json_ignores_session_for_key_stability() {
        let messages = json!([{"role": "user", "content": "hi"}]);
        let mut with_session = CreateParams::new("claude-sonnet-4-5", messages.clone()).with_session("s");
        with_session.take_session();
        let without_session = CreateParams::new("claude-sonnet-4-5", messages);

        assert_eq!(
            with_session.kwargs_json().unwrap(),
            without_session.kwargs_json().unwrap()
        );
    }
}
