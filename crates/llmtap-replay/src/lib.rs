//! LLMTap Deterministic Replay
//!
//! This crate provides the replay-cache collaborator: a keyed lookup
//! of previously captured serialized responses, consulted before a
//! live provider call so a recorded completion can be substituted
//! deterministically ("time travel"). The cache stores opaque strings;
//! deserializing an override into provider shapes is the provider
//! integration's concern.

pub mod config;
pub mod store;

pub use config::ReplayConfig;
pub use store::{FileReplayStore, MemoryReplayStore, ReplayStore, cache_key};
