//! Telemetry event model
//!
//! Events are built up incrementally while a provider response is
//! consumed and handed to an [`EventRecorder`](crate::EventRecorder)
//! exactly once when finalized. Until `end_timestamp` is set the
//! completion content is append-only; after finalization the event
//! must not be mutated again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accumulating completion payload for an in-flight model call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Role reported by the provider (normally "assistant")
    pub role: String,

    /// Concatenated completion text
    pub content: String,
}

/// One logical model invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmEvent {
    /// Correlation id for this invocation
    pub id: Uuid,

    /// When the intercepted call was entered
    pub init_timestamp: DateTime<Utc>,

    /// Set exactly once when the response is fully consumed
    pub end_timestamp: Option<DateTime<Utc>>,

    /// Session identifier stripped from the call arguments
    pub session_id: Option<String>,

    /// Agent correlation id from the caller's scope
    pub agent_id: Option<Uuid>,

    /// Model requested
    pub model: Option<String>,

    /// Opaque request parameters (session already removed)
    pub params: serde_json::Value,

    /// The request's message list
    pub prompt: Option<serde_json::Value>,

    /// Input token count from provider usage
    pub prompt_tokens: Option<u32>,

    /// Accumulating completion
    pub completion: Completion,

    /// Output token count from provider usage
    pub completion_tokens: Option<u32>,

    /// Opaque raw provider return (first fragment or whole response)
    pub returns: Option<serde_json::Value>,
}

impl LlmEvent {
    /// Create an in-flight event at call entry
    pub fn new(init_timestamp: DateTime<Utc>, params: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            init_timestamp,
            end_timestamp: None,
            session_id: None,
            agent_id: None,
            model: None,
            params,
            prompt: None,
            prompt_tokens: None,
            completion: Completion::default(),
            completion_tokens: None,
            returns: None,
        }
    }

    /// Set the session id stripped from the call arguments
    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Whether the event has been finalized
    pub fn is_finalized(&self) -> bool {
        self.end_timestamp.is_some()
    }

    /// Append streamed completion text. No-op once finalized.
    pub fn append_content(&mut self, text: &str) {
        if !self.is_finalized() {
            self.completion.content.push_str(text);
        }
    }

    /// Finalize the event, making it eligible for recording
    pub fn finalize(&mut self) {
        if self.end_timestamp.is_none() {
            self.end_timestamp = Some(Utc::now());
        }
    }
}

/// Accumulating log for one tool-use block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolLog {
    /// Content-block type reported by the provider ("tool_use")
    pub block_type: String,

    /// Accumulated partial-JSON arguments
    pub input: String,
}

/// One tool-use sub-invocation discovered inside a streamed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEvent {
    /// The provider's content-block id, used to correlate deltas
    pub id: String,

    /// Tool name
    pub name: String,

    /// Accumulated invocation arguments
    pub logs: ToolLog,
}

impl ToolEvent {
    /// Create a tool event when its content block starts
    pub fn new(id: impl Into<String>, name: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            logs: ToolLog {
                block_type: block_type.into(),
                input: String::new(),
            },
        }
    }

    /// Append a partial-JSON arguments fragment
    pub fn append_input(&mut self, partial_json: &str) {
        self.logs.input.push_str(partial_json);
    }
}

/// Recorded in place of a malformed LlmEvent when normalization fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,

    /// The in-progress event that triggered the failure
    pub trigger: LlmEvent,

    /// Human-readable fault description
    pub fault: String,
}

impl ErrorEvent {
    pub fn new(trigger: LlmEvent, fault: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            trigger,
            fault: fault.into(),
        }
    }
}

/// Envelope handed to the recording collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Llm(LlmEvent),
    Tool(ToolEvent),
    Error(ErrorEvent),
}

impl Event {
    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Llm(_) => "llm",
            Event::Tool(_) => "tool",
            Event::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_content_accumulates_until_finalized() {
        let mut event = LlmEvent::new(Utc::now(), serde_json::json!({"model": "claude"}));
        event.append_content("Hello");
        event.append_content(", world");
        assert_eq!(event.completion.content, "Hello, world");

        event.finalize();
        assert!(event.is_finalized());

        // Finalized events are immutable
        event.append_content("!");
        assert_eq!(event.completion.content, "Hello, world");
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut event = LlmEvent::new(Utc::now(), serde_json::Value::Null);
        event.finalize();
        let first = event.end_timestamp;
        event.finalize();
        assert_eq!(event.end_timestamp, first);
    }

    #[test]
    fn tool_event_accumulates_partial_json() {
        let mut tool = ToolEvent::new("toolu_01", "get_weather", "tool_use");
        tool.append_input("{\"city\":");
        tool.append_input("\"Paris\"}");
        assert_eq!(tool.logs.input, "{\"city\":\"Paris\"}");
        assert_eq!(tool.logs.block_type, "tool_use");
    }

    #[test]
    fn event_envelope_round_trips_tagged() {
        let event = Event::Tool(ToolEvent::new("toolu_01", "search", "tool_use"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"tool\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), "tool");
    }
}
