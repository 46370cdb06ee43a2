//! LLMTap Anthropic Integration
//!
//! Interception layer for the Anthropic Messages API. The host
//! application wraps its client (anything implementing [`MessagesApi`]
//! or [`AsyncMessagesApi`]) in a [`Tap`], which routes every call
//! through the response normalizer, records telemetry events to an
//! [`EventRecorder`](llmtap_core::EventRecorder), and can substitute a
//! deterministic replay override for a live call. Returned responses
//! and streams are shape-identical to the inner client's: callers
//! cannot detect instrumentation.

pub mod client;
pub mod interceptor;
pub mod lifecycle;
pub mod normalizer;
pub mod replay;
pub mod wire;

pub use client::{AsyncEventStream, AsyncMessagesApi, MessagesApi, RawResponse, SyncEventStream};
pub use interceptor::{AsyncRawMessages, RawMessages, Tap};
pub use lifecycle::{install, install_async, revert, revert_async};
pub use normalizer::{Normalizer, RecordedEventStream, RecordedStream};
pub use replay::{ReplayPayload, resolve_override};
pub use wire::{
    ContentBlock, CreateParams, Message, MessageDeltaBody, MessageDeltaUsage, StreamContentBlock,
    StreamDelta, StreamEvent, Usage,
};
