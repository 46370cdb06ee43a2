//! Event recorder collaborator
//!
//! The recorder receives finished events and persists them. Recording
//! is fire-and-forget: the interception layer never blocks a caller on
//! recorder failures, and the fold step that produces events must not
//! suspend, so the trait is synchronous. Async backends can bridge via
//! a channel sender behind this trait.

use crate::event::Event;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Recording collaborator interface
pub trait EventRecorder: Send + Sync {
    /// Record a finished event. Fire-and-forget: implementations must
    /// swallow their own failures (logging them) rather than propagate.
    fn record(&self, event: Event);
}

/// In-memory recorder, used by tests and for in-process inspection
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<Event>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().expect("recorder mutex poisoned").clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().expect("recorder mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, event: Event) {
        self.events.lock().expect("recorder mutex poisoned").push(event);
    }
}

/// Append-only NDJSON file recorder
///
/// One event per line, in arrival order. Uses std::fs rather than
/// tokio::fs: record() is called from blocking iterators and from
/// poll_next, where suspension is not allowed.
pub struct JsonlRecorder {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlRecorder {
    /// Open (creating if needed) an NDJSON event log at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventRecorder for JsonlRecorder {
    fn record(&self, event: Event) {
        let line = match serde_json::to_vec(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, kind = event.kind(), "Failed to serialize event; dropping");
                return;
            }
        };

        let mut file = match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Err(e) = file.write_all(&line).and_then(|_| file.write_all(b"\n")) {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to append event; dropping");
        }
    }
}
