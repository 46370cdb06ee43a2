//! Provider client capability traits
//!
//! The provider client itself (transport, auth, retries) is an opaque
//! dependency supplied by the host. These traits are the seam the
//! interceptor wraps: a blocking surface and an async surface, each
//! with a standard and a beta entry point mirroring the upstream API
//! variants. The beta methods default to the standard implementations
//! so clients without a beta surface need not duplicate them.

use crate::wire::{CreateParams, Message, StreamEvent};
use async_trait::async_trait;
use futures::Stream;
use llmtap_core::Result;

/// A blocking stream of response fragments. Single-pass and not
/// restartable, mirroring the underlying provider stream.
pub type SyncEventStream = Box<dyn Iterator<Item = Result<StreamEvent>> + Send>;

/// An async stream of response fragments. Single-pass and not
/// restartable.
pub type AsyncEventStream = Box<dyn Stream<Item = Result<StreamEvent>> + Send + Unpin>;

/// Blocking Messages API surface
pub trait MessagesApi: Send + Sync {
    /// Non-streaming create
    fn create(&self, params: CreateParams) -> Result<Message>;

    /// Streaming create
    fn create_stream(&self, params: CreateParams) -> Result<SyncEventStream>;

    /// Beta non-streaming create
    fn create_beta(&self, params: CreateParams) -> Result<Message> {
        self.create(params)
    }

    /// Beta streaming create
    fn create_stream_beta(&self, params: CreateParams) -> Result<SyncEventStream> {
        self.create_stream(params)
    }
}

/// Async Messages API surface
#[async_trait]
pub trait AsyncMessagesApi: Send + Sync {
    /// Non-streaming create
    async fn create(&self, params: CreateParams) -> Result<Message>;

    /// Streaming create
    async fn create_stream(&self, params: CreateParams) -> Result<AsyncEventStream>;

    /// Beta non-streaming create
    async fn create_beta(&self, params: CreateParams) -> Result<Message> {
        self.create(params).await
    }

    /// Beta streaming create
    async fn create_stream_beta(&self, params: CreateParams) -> Result<AsyncEventStream> {
        self.create_stream(params).await
    }
}

/// Raw-response wrapper for the beta `raw()` access pattern
///
/// Upstream exposes a raw variant whose create returns the response
/// plus transport detail instead of the parsed model alone. The
/// wrapper keeps that two-step access (`create` then `parse`) so the
/// instrumented path is indistinguishable from the plain client's.
#[derive(Debug, Clone)]
pub struct RawResponse {
    message: Message,
}

impl RawResponse {
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    /// Borrow the parsed message
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Consume the wrapper, yielding the parsed message
    pub fn parse(self) -> Message {
        self.message
    }
}
