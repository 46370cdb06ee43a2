//! Replay cache configuration

use std::path::PathBuf;

/// Environment variable overriding the replay cache directory
pub const REPLAY_DIR_ENV: &str = "LLMTAP_REPLAY_DIR";

/// Configuration for the file-backed replay cache
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Directory holding one override file per cache key
    pub dir: PathBuf,
}

impl ReplayConfig {
    /// Create a configuration pointing at an explicit directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve from the environment, falling back to the platform
    /// cache directory (`<cache>/llmtap/replay`)
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(REPLAY_DIR_ENV) {
            return Self::new(dir);
        }

        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("llmtap").join("replay"))
    }

    /// Override the cache directory
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }
}
