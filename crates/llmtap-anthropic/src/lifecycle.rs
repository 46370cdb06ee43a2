//! Lifecycle controller
//!
//! A process-wide registry enforcing at most one active interception
//! per call surface (blocking and async). `install` captures the
//! original client handle once (first call wins) and hands out the
//! tap; `revert` returns that exact handle so the host can restore
//! pre-install behavior. The registry mutex is the only process-wide
//! mutable state in the crate; per-call fold state is exclusively
//! owned by each call.

use crate::client::{AsyncMessagesApi, MessagesApi};
use crate::interceptor::Tap;
use llmtap_core::{Error, EventRecorder, Result};
use llmtap_replay::ReplayStore;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

struct BlockingEntry {
    original: Arc<dyn MessagesApi>,
    tap: Arc<Tap<dyn MessagesApi>>,
}

struct AsyncEntry {
    original: Arc<dyn AsyncMessagesApi>,
    tap: Arc<Tap<dyn AsyncMessagesApi>>,
}

#[derive(Default)]
struct Registry {
    blocking: Option<BlockingEntry>,
    asynchronous: Option<AsyncEntry>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));

fn registry() -> std::sync::MutexGuard<'static, Registry> {
    match REGISTRY.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Install interception for a blocking client.
///
/// Idempotent: if an interception is already active, the original is
/// not recaptured and the existing tap is returned (first call wins).
pub fn install(
    client: Arc<dyn MessagesApi>,
    recorder: Arc<dyn EventRecorder>,
    replay: Option<Arc<dyn ReplayStore>>,
) -> Arc<Tap<dyn MessagesApi>> {
    let mut registry = registry();

    if let Some(entry) = &registry.blocking {
        tracing::warn!("Blocking interception already installed; reusing the active tap");
        return entry.tap.clone();
    }

    let mut tap = Tap::new(client.clone(), recorder);
    if let Some(replay) = replay {
        tap = tap.with_replay(replay);
    }
    let tap = Arc::new(tap);

    registry.blocking = Some(BlockingEntry {
        original: client,
        tap: tap.clone(),
    });
    tracing::debug!("Installed blocking interception");
    tap
}

/// Revert the blocking interception, returning the exact original
/// client handle captured at install time.
pub fn revert() -> Result<Arc<dyn MessagesApi>> {
    match registry().blocking.take() {
        Some(entry) => {
            tracing::debug!("Reverted blocking interception");
            Ok(entry.original)
        }
        None => Err(Error::Lifecycle(
            "revert called without an active install".to_string(),
        )),
    }
}

/// Install interception for an async client. Same contract as
/// [`install`].
pub fn install_async(
    client: Arc<dyn AsyncMessagesApi>,
    recorder: Arc<dyn EventRecorder>,
    replay: Option<Arc<dyn ReplayStore>>,
) -> Arc<Tap<dyn AsyncMessagesApi>> {
    let mut registry = registry();

    if let Some(entry) = &registry.asynchronous {
        tracing::warn!("Async interception already installed; reusing the active tap");
        return entry.tap.clone();
    }

    let mut tap = Tap::new(client.clone(), recorder);
    if let Some(replay) = replay {
        tap = tap.with_replay(replay);
    }
    let tap = Arc::new(tap);

    registry.asynchronous = Some(AsyncEntry {
        original: client,
        tap: tap.clone(),
    });
    tracing::debug!("Installed async interception");
    tap
}

/// Revert the async interception. Same contract as [`revert`].
pub fn revert_async() -> Result<Arc<dyn AsyncMessagesApi>> {
    match registry().asynchronous.take() {
        Some(entry) => {
            tracing::debug!("Reverted async interception");
            Ok(entry.original)
        }
        None => Err(Error::Lifecycle(
            "revert called without an active install".to_string(),
        )),
    }
}
