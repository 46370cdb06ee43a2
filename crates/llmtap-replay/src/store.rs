//! Replay override stores
//!
//! An override store maps the canonical JSON of a call's arguments to
//! a previously captured serialized response. Lookup is pure: no
//! mutation of the arguments, no network, no provider call. A missing
//! or unreadable entry simply means "no override".

use crate::config::ReplayConfig;
use llmtap_core::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Derive the cache key for a call: SHA-256 hex of the canonical
/// kwargs JSON (with the session key already stripped)
pub fn cache_key(kwargs_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kwargs_json.as_bytes());
    hex::encode(hasher.finalize())
}

/// Replay-cache collaborator interface
pub trait ReplayStore: Send + Sync {
    /// Look up a serialized override for the given call arguments
    fn lookup(&self, kwargs_json: &str) -> Option<String>;

    /// Capture an override so a later run can replay it
    fn store(&self, kwargs_json: &str, serialized: &str) -> Result<()>;
}

/// File-backed override store: one `<key>.json` file per entry
pub struct FileReplayStore {
    dir: PathBuf,
}

impl FileReplayStore {
    pub fn new(config: ReplayConfig) -> Self {
        Self { dir: config.dir }
    }

    fn entry_path(&self, kwargs_json: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(kwargs_json)))
    }
}

impl ReplayStore for FileReplayStore {
    fn lookup(&self, kwargs_json: &str) -> Option<String> {
        let path = self.entry_path(kwargs_json);
        match std::fs::read_to_string(&path) {
            Ok(serialized) => {
                tracing::debug!(path = %path.display(), "Replay override found");
                Some(serialized)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read replay override; treating as miss");
                None
            }
        }
    }

    fn store(&self, kwargs_json: &str, serialized: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.entry_path(kwargs_json), serialized)?;
        Ok(())
    }
}

/// In-memory override store for tests
#[derive(Debug, Default)]
pub struct MemoryReplayStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryReplayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplayStore for MemoryReplayStore {
    fn lookup(&self, kwargs_json: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("replay store mutex poisoned")
            .get(&cache_key(kwargs_json))
            .cloned()
    }

    fn store(&self, kwargs_json: &str, serialized: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("replay store mutex poisoned")
            .insert(cache_key(kwargs_json), serialized.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KWARGS: &str = r#"{"model":"claude-sonnet-4-5","messages":[{"role":"user","content":"hi"}]}"#;

    #[test]
    fn cache_key_is_stable_and_kwargs_sensitive() {
        assert_eq!(cache_key(KWARGS), cache_key(KWARGS));
        assert_ne!(cache_key(KWARGS), cache_key("{\"model\":\"other\"}"));
    }

    #[test]
    fn file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileReplayStore::new(ReplayConfig::new(temp_dir.path()));

        assert_eq!(store.lookup(KWARGS), None);

        store.store(KWARGS, "{\"type\":\"message\"}").unwrap();
        assert_eq!(store.lookup(KWARGS).as_deref(), Some("{\"type\":\"message\"}"));

        // Different kwargs miss
        assert_eq!(store.lookup("{\"model\":\"other\"}"), None);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryReplayStore::new();
        store.store(KWARGS, "payload").unwrap();
        assert_eq!(store.lookup(KWARGS).as_deref(), Some("payload"));
    }
}
