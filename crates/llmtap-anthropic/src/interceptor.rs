//! Call interceptor
//!
//! [`Tap`] wraps a provider client behind the same capability traits,
//! so the host application swaps its client for the tap and changes
//! nothing else. Every entry point: captures the call timestamp,
//! strips the optional `session` argument before anything is
//! forwarded, consults the replay store, and routes the response (live
//! or replayed) through the normalizer. Returned values are
//! shape-identical to the inner client's.

use crate::client::{AsyncMessagesApi, MessagesApi, RawResponse, SyncEventStream};
use crate::normalizer::Normalizer;
use crate::replay::{ReplayPayload, resolve_override};
use crate::wire::{CreateParams, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use llmtap_core::{Error, EventRecorder, Result};
use llmtap_replay::ReplayStore;
use std::sync::Arc;

/// Interceptor wrapping a provider client
pub struct Tap<C: ?Sized> {
    inner: Arc<C>,
    normalizer: Normalizer,
    replay: Option<Arc<dyn ReplayStore>>,
}

/// Per-call state captured at entry, before any forwarding
struct Prepared {
    init_timestamp: DateTime<Utc>,
    session: Option<String>,
    /// Call arguments with the session key already stripped
    params: CreateParams,
    /// Serialized replay override, if the store has one for these kwargs
    override_payload: Option<String>,
}

impl<C: ?Sized> Tap<C> {
    /// Wrap a client, recording events to `recorder`
    pub fn new(inner: Arc<C>, recorder: Arc<dyn EventRecorder>) -> Self {
        Self {
            inner,
            normalizer: Normalizer::new(recorder),
            replay: None,
        }
    }

    /// Enable deterministic replay from `replay`
    pub fn with_replay(mut self, replay: Arc<dyn ReplayStore>) -> Self {
        self.replay = Some(replay);
        self
    }

    /// The wrapped client
    pub fn inner(&self) -> &Arc<C> {
        &self.inner
    }

    fn prepare(&self, mut params: CreateParams) -> Prepared {
        let init_timestamp = Utc::now();
        let session = params.take_session();

        let override_payload = match &self.replay {
            Some(store) => match params.kwargs_json() {
                Ok(kwargs) => store.lookup(&kwargs),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to canonicalize call arguments; skipping replay lookup");
                    None
                }
            },
            None => None,
        };

        Prepared {
            init_timestamp,
            session,
            params,
            override_payload,
        }
    }

    fn replay_message(&self, serialized: &str, prepared: &Prepared) -> Result<Message> {
        match resolve_override(serialized) {
            Some(ReplayPayload::Message(message)) => {
                tracing::debug!(model = %prepared.params.model, "Substituting replay override for live call");
                Ok(self.normalizer.normalize_message(
                    *message,
                    &prepared.params,
                    prepared.init_timestamp,
                    prepared.session.as_deref(),
                ))
            }
            Some(ReplayPayload::Fragment(_)) => {
                tracing::error!(
                    model = %prepared.params.model,
                    "Replay override is a stream fragment but the call is non-streaming"
                );
                Err(Error::ReplayValidation)
            }
            None => {
                tracing::error!(
                    override_payload = %serialized,
                    "Replay override matched no known response schema"
                );
                Err(Error::ReplayValidation)
            }
        }
    }

    fn replay_stream(&self, serialized: &str, prepared: &Prepared) -> Result<SyncEventStream> {
        match resolve_override(serialized) {
            Some(ReplayPayload::Fragment(fragment)) => {
                tracing::debug!(model = %prepared.params.model, "Substituting replay override for live stream");
                let inner = std::iter::once(Ok(*fragment));
                Ok(Box::new(self.normalizer.wrap_stream(
                    inner,
                    &prepared.params,
                    prepared.init_timestamp,
                    prepared.session.as_deref(),
                )))
            }
            Some(ReplayPayload::Message(_)) => {
                tracing::error!(
                    model = %prepared.params.model,
                    "Replay override is a complete message but the call is streaming"
                );
                Err(Error::ReplayValidation)
            }
            None => {
                tracing::error!(
                    override_payload = %serialized,
                    "Replay override matched no known response schema"
                );
                Err(Error::ReplayValidation)
            }
        }
    }

    fn replay_async_stream(
        &self,
        serialized: &str,
        prepared: &Prepared,
    ) -> Result<crate::client::AsyncEventStream> {
        match resolve_override(serialized) {
            Some(ReplayPayload::Fragment(fragment)) => {
                tracing::debug!(model = %prepared.params.model, "Substituting replay override for live stream");
                let inner = futures::stream::iter(std::iter::once(Ok(*fragment)));
                Ok(Box::new(self.normalizer.wrap_async_stream(
                    inner,
                    &prepared.params,
                    prepared.init_timestamp,
                    prepared.session.as_deref(),
                )))
            }
            Some(ReplayPayload::Message(_)) => {
                tracing::error!(
                    model = %prepared.params.model,
                    "Replay override is a complete message but the call is streaming"
                );
                Err(Error::ReplayValidation)
            }
            None => {
                tracing::error!(
                    override_payload = %serialized,
                    "Replay override matched no known response schema"
                );
                Err(Error::ReplayValidation)
            }
        }
    }
}

impl<C: MessagesApi + ?Sized> Tap<C> {
    /// Raw-response accessor for the beta path, mirroring the
    /// upstream `with_raw_response` access pattern
    pub fn raw(&self) -> RawMessages<'_, C> {
        RawMessages { tap: self }
    }

    fn create_with<F>(&self, params: CreateParams, call: F) -> Result<Message>
    where
        F: FnOnce(&C, CreateParams) -> Result<Message>,
    {
        let prepared = self.prepare(params);
        if let Some(serialized) = &prepared.override_payload {
            return self.replay_message(serialized, &prepared);
        }

        let message = call(self.inner.as_ref(), prepared.params.clone())?;
        Ok(self.normalizer.normalize_message(
            message,
            &prepared.params,
            prepared.init_timestamp,
            prepared.session.as_deref(),
        ))
    }

    fn create_stream_with<F>(&self, params: CreateParams, call: F) -> Result<SyncEventStream>
    where
        F: FnOnce(&C, CreateParams) -> Result<SyncEventStream>,
    {
        let prepared = self.prepare(params);
        if let Some(serialized) = &prepared.override_payload {
            return self.replay_stream(serialized, &prepared);
        }

        let stream = call(self.inner.as_ref(), prepared.params.clone())?;
        Ok(Box::new(self.normalizer.wrap_stream(
            stream,
            &prepared.params,
            prepared.init_timestamp,
            prepared.session.as_deref(),
        )))
    }
}

impl<C: MessagesApi + ?Sized> MessagesApi for Tap<C> {
    fn create(&self, params: CreateParams) -> Result<Message> {
        self.create_with(params, |inner, params| inner.create(params))
    }

    fn create_stream(&self, params: CreateParams) -> Result<SyncEventStream> {
        self.create_stream_with(params, |inner, params| inner.create_stream(params))
    }

    fn create_beta(&self, params: CreateParams) -> Result<Message> {
        self.create_with(params, |inner, params| inner.create_beta(params))
    }

    fn create_stream_beta(&self, params: CreateParams) -> Result<SyncEventStream> {
        self.create_stream_with(params, |inner, params| inner.create_stream_beta(params))
    }
}

#[async_trait]
impl<C: AsyncMessagesApi + ?Sized> AsyncMessagesApi for Tap<C> {
    async fn create(&self, params: CreateParams) -> Result<Message> {
        let prepared = self.prepare(params);
        if let Some(serialized) = &prepared.override_payload {
            return self.replay_message(serialized, &prepared);
        }

        let message = self.inner.create(prepared.params.clone()).await?;
        Ok(self.normalizer.normalize_message(
            message,
            &prepared.params,
            prepared.init_timestamp,
            prepared.session.as_deref(),
        ))
    }

    async fn create_stream(&self, params: CreateParams) -> Result<crate::client::AsyncEventStream> {
        let prepared = self.prepare(params);
        if let Some(serialized) = &prepared.override_payload {
            return self.replay_async_stream(serialized, &prepared);
        }

        let stream = self.inner.create_stream(prepared.params.clone()).await?;
        Ok(Box::new(self.normalizer.wrap_async_stream(
            stream,
            &prepared.params,
            prepared.init_timestamp,
            prepared.session.as_deref(),
        )))
    }

    async fn create_beta(&self, params: CreateParams) -> Result<Message> {
        let prepared = self.prepare(params);
        if let Some(serialized) = &prepared.override_payload {
            return self.replay_message(serialized, &prepared);
        }

        let message = self.inner.create_beta(prepared.params.clone()).await?;
        Ok(self.normalizer.normalize_message(
            message,
            &prepared.params,
            prepared.init_timestamp,
            prepared.session.as_deref(),
        ))
    }

    async fn create_stream_beta(
        &self,
        params: CreateParams,
    ) -> Result<crate::client::AsyncEventStream> {
        let prepared = self.prepare(params);
        if let Some(serialized) = &prepared.override_payload {
            return self.replay_async_stream(serialized, &prepared);
        }

        let stream = self.inner.create_stream_beta(prepared.params.clone()).await?;
        Ok(Box::new(self.normalizer.wrap_async_stream(
            stream,
            &prepared.params,
            prepared.init_timestamp,
            prepared.session.as_deref(),
        )))
    }
}

/// Property-style accessor for the raw beta variant
///
/// `tap.raw().create(params)` goes through the same intercepted logic
/// as `tap.create_beta(params)` and wraps the result, so the two-step
/// raw access pattern keeps working unchanged on an instrumented
/// client.
pub struct RawMessages<'a, C: ?Sized> {
    tap: &'a Tap<C>,
}

impl<C: MessagesApi + ?Sized> RawMessages<'_, C> {
    pub fn create(&self, params: CreateParams) -> Result<RawResponse> {
        self.tap.create_beta(params).map(RawResponse::new)
    }
}

/// Async property-style accessor for the raw beta variant
pub struct AsyncRawMessages<'a, C: ?Sized> {
    tap: &'a Tap<C>,
}

impl<C: AsyncMessagesApi + ?Sized> Tap<C> {
    /// Async raw-response accessor for the beta path
    pub fn raw_async(&self) -> AsyncRawMessages<'_, C> {
        AsyncRawMessages { tap: self }
    }
}

impl<C: AsyncMessagesApi + ?Sized> AsyncRawMessages<'_, C> {
    pub async fn create(&self, params: CreateParams) -> Result<RawResponse> {
        self.tap.create_beta(params).await.map(RawResponse::new)
    }
}
