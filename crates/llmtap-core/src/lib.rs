//! LLMTap Core Types and Traits
//!
//! This crate provides the fundamental pieces shared by the LLMTap
//! provider integrations:
//! - Telemetry event model (LlmEvent, ToolEvent, ErrorEvent)
//! - The EventRecorder collaborator trait and built-in recorders
//! - Agent correlation context
//! - Core error types

pub mod context;
pub mod error;
pub mod event;
pub mod recorder;

pub use context::{AgentScope, current_agent_id};
pub use error::{Error, Result};
pub use event::{Completion, ErrorEvent, Event, LlmEvent, ToolEvent, ToolLog};
pub use recorder::{EventRecorder, JsonlRecorder, MemoryRecorder};
