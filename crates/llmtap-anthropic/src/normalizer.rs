//! Response normalizer
//!
//! Folds a raw provider response (a complete `Message` or an
//! incremental fragment stream) into one telemetry event and hands it
//! to the recording collaborator. The response itself is returned to
//! the caller unchanged in shape: object responses come back as-is,
//! streams come back wrapped in a pass-through adapter that yields
//! every fragment it folds.
//!
//! Exactly one record call happens per logical invocation: the
//! finished `LlmEvent` at `message_stop` (or immediately for object
//! responses), or a single `ErrorEvent` if a fold step hits an
//! unexpected shape. Normalization failures never propagate to the
//! caller.

use crate::wire::{ContentBlock, CreateParams, Message, StreamContentBlock, StreamDelta, StreamEvent};
use chrono::{DateTime, Utc};
use futures::Stream;
use llmtap_core::{
    Completion, ErrorEvent, Event, EventRecorder, LlmEvent, Result, ToolEvent, current_agent_id,
};
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Builds telemetry events out of provider responses
#[derive(Clone)]
pub struct Normalizer {
    recorder: Arc<dyn EventRecorder>,
}

impl Normalizer {
    pub fn new(recorder: Arc<dyn EventRecorder>) -> Self {
        Self { recorder }
    }

    fn base_event(
        &self,
        params: &CreateParams,
        init_timestamp: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> LlmEvent {
        let params_value = serde_json::to_value(params).unwrap_or(Value::Null);
        LlmEvent::new(init_timestamp, params_value).with_session(session_id.map(str::to_owned))
    }

    /// Fold a complete message in one step and record immediately.
    /// The original response is returned unmodified either way.
    pub fn normalize_message(
        &self,
        message: Message,
        params: &CreateParams,
        init_timestamp: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> Message {
        let mut event = self.base_event(params, init_timestamp, session_id);
        match fold_message(&mut event, &message, params) {
            Ok(()) => self.recorder.record(Event::Llm(event)),
            Err(fault) => {
                tracing::warn!(
                    fault = %fault,
                    model = %params.model,
                    "Unable to parse model response; recording error event instead"
                );
                self.recorder.record(Event::Error(ErrorEvent::new(event, fault)));
            }
        }
        message
    }

    /// Wrap a blocking fragment stream in a folding pass-through
    /// adapter. Single-pass and not restartable; dropping the adapter
    /// before `message_stop` discards the in-progress event without
    /// recording.
    pub fn wrap_stream<I>(
        &self,
        inner: I,
        params: &CreateParams,
        init_timestamp: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> RecordedStream<I>
    where
        I: Iterator<Item = Result<StreamEvent>>,
    {
        RecordedStream {
            inner,
            fold: self.stream_fold(params, init_timestamp, session_id),
        }
    }

    /// Async counterpart of [`wrap_stream`](Self::wrap_stream); folds
    /// happen in arrival order at each resolved `poll_next`.
    pub fn wrap_async_stream<S>(
        &self,
        inner: S,
        params: &CreateParams,
        init_timestamp: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> RecordedEventStream<S>
    where
        S: Stream<Item = Result<StreamEvent>> + Unpin,
    {
        RecordedEventStream {
            inner,
            fold: self.stream_fold(params, init_timestamp, session_id),
        }
    }

    fn stream_fold(
        &self,
        params: &CreateParams,
        init_timestamp: DateTime<Utc>,
        session_id: Option<&str>,
    ) -> StreamFold {
        StreamFold::new(
            self.recorder.clone(),
            self.base_event(params, init_timestamp, session_id),
            params.model.clone(),
            params.messages.clone(),
        )
    }
}

fn fold_message(
    event: &mut LlmEvent,
    message: &Message,
    params: &CreateParams,
) -> std::result::Result<(), String> {
    event.returns = serde_json::to_value(message).ok();
    event.agent_id = current_agent_id();
    event.prompt = Some(params.messages.clone());
    event.prompt_tokens = Some(message.usage.input_tokens);

    let first = message
        .content
        .first()
        .ok_or_else(|| "response contained no content blocks".to_string())?;
    let text = match first {
        ContentBlock::Text { text } => text.clone(),
        ContentBlock::ToolUse { .. } => {
            return Err("first content block is not text".to_string());
        }
    };

    event.completion = Completion {
        role: "assistant".to_string(),
        content: text,
    };
    event.completion_tokens = Some(message.usage.output_tokens);
    event.model = Some(message.model.clone());
    event.finalize();
    Ok(())
}

/// Per-stream fold state, exclusively owned by one consumption context
struct StreamFold {
    recorder: Arc<dyn EventRecorder>,
    event: LlmEvent,
    model: String,
    prompt: Value,
    tools: HashMap<String, ToolEvent>,
    tool_order: Vec<String>,
    active_tool: Option<String>,
    failed: bool,
    finalized: bool,
}

impl StreamFold {
    fn new(recorder: Arc<dyn EventRecorder>, event: LlmEvent, model: String, prompt: Value) -> Self {
        Self {
            recorder,
            event,
            model,
            prompt,
            tools: HashMap::new(),
            tool_order: Vec::new(),
            active_tool: None,
            failed: false,
            finalized: false,
        }
    }

    /// Incorporate one fragment. Never panics, never suspends; any
    /// unexpected shape degrades to a single recorded ErrorEvent.
    fn apply(&mut self, fragment: &StreamEvent) {
        if self.failed || self.finalized {
            return;
        }

        match fragment {
            StreamEvent::MessageStart { message } => {
                self.event.returns = serde_json::to_value(fragment).ok();
                self.event.agent_id = current_agent_id();
                self.event.model = Some(self.model.clone());
                self.event.prompt = Some(self.prompt.clone());
                self.event.prompt_tokens = Some(message.usage.input_tokens);
                self.event.completion = Completion {
                    role: message.role.clone(),
                    content: String::new(),
                };
            }

            StreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                // Text accumulation begins on the first delta
                StreamContentBlock::Text { .. } => {}
                StreamContentBlock::ToolUse { id, name } => {
                    let tool = ToolEvent::new(id.clone(), name.clone(), content_block.block_type());
                    self.active_tool = Some(id.clone());
                    self.tool_order.push(id.clone());
                    self.tools.insert(id.clone(), tool);
                }
            },

            StreamEvent::ContentBlockDelta { delta, .. } => match delta {
                StreamDelta::TextDelta { text } => self.event.append_content(text),
                StreamDelta::InputJsonDelta { partial_json } => {
                    let appended = match self.active_tool.clone() {
                        Some(id) => match self.tools.get_mut(&id) {
                            Some(tool) => {
                                tool.append_input(partial_json);
                                true
                            }
                            None => false,
                        },
                        None => false,
                    };
                    if !appended {
                        self.fail("input_json_delta without an active tool_use block", fragment);
                    }
                }
            },

            StreamEvent::ContentBlockStop { .. } => {
                self.active_tool = None;
            }

            StreamEvent::MessageDelta { usage, .. } => {
                self.event.completion_tokens = Some(usage.output_tokens);
            }

            StreamEvent::MessageStop => self.finish(),

            StreamEvent::Unknown => {
                self.fail("unrecognized stream event discriminator", fragment)
            }
        }
    }

    fn fail(&mut self, fault: &str, fragment: &StreamEvent) {
        if self.failed || self.finalized {
            return;
        }
        self.failed = true;
        tracing::warn!(
            fault,
            payload = ?fragment,
            "Unable to parse stream fragment; recording error event and skipping upload"
        );
        self.recorder
            .record(Event::Error(ErrorEvent::new(self.event.clone(), fault)));
    }

    /// The single finalization point: emit completed tool events in
    /// block-arrival order, then the finished LlmEvent.
    fn finish(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        // An ErrorEvent already stands in for this invocation
        if self.failed {
            return;
        }

        for id in self.tool_order.drain(..) {
            if let Some(tool) = self.tools.remove(&id) {
                self.recorder.record(Event::Tool(tool));
            }
        }

        self.event.finalize();
        self.recorder.record(Event::Llm(self.event.clone()));
    }
}

/// Blocking pass-through adapter: folds each fragment, then yields it
/// unchanged. Single-pass; dropping it mid-stream records nothing.
pub struct RecordedStream<I> {
    inner: I,
    fold: StreamFold,
}

impl<I> Iterator for RecordedStream<I>
where
    I: Iterator<Item = Result<StreamEvent>>,
{
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next() {
            Some(Ok(fragment)) => {
                self.fold.apply(&fragment);
                Some(Ok(fragment))
            }
            // Provider errors pass through untouched
            Some(Err(e)) => Some(Err(e)),
            None => None,
        }
    }
}

/// Async pass-through adapter; suspension only happens at the inner
/// stream's fragment retrieval, never inside a fold step.
pub struct RecordedEventStream<S> {
    inner: S,
    fold: StreamFold,
}

impl<S> Stream for RecordedEventStream<S>
where
    S: Stream<Item = Result<StreamEvent>> + Unpin,
{
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.as_mut().get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(fragment))) => {
                this.fold.apply(&fragment);
                Poll::Ready(Some(Ok(fragment)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: Unpin> Unpin for RecordedEventStream<S> {}
