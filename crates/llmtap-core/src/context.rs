//! Agent correlation context
//!
//! An agent id is threaded explicitly through a scoped, per-thread
//! context rather than recovered by inspecting the call stack. Scopes
//! nest; the innermost active scope wins.

use std::cell::RefCell;
use uuid::Uuid;

thread_local! {
    static AGENT_STACK: RefCell<Vec<Uuid>> = const { RefCell::new(Vec::new()) };
}

/// The agent id for the current execution context, if any
pub fn current_agent_id() -> Option<Uuid> {
    AGENT_STACK.with(|stack| stack.borrow().last().copied())
}

/// RAII guard marking the current thread as running on behalf of an agent
///
/// ```
/// use llmtap_core::{AgentScope, current_agent_id};
/// use uuid::Uuid;
///
/// let agent = Uuid::new_v4();
/// assert_eq!(current_agent_id(), None);
/// {
///     let _scope = AgentScope::enter(agent);
///     assert_eq!(current_agent_id(), Some(agent));
/// }
/// assert_eq!(current_agent_id(), None);
/// ```
#[must_use = "the agent scope ends when this guard is dropped"]
pub struct AgentScope {
    _private: (),
}

impl AgentScope {
    /// Push `agent_id` onto the current thread's scope stack
    pub fn enter(agent_id: Uuid) -> Self {
        AGENT_STACK.with(|stack| stack.borrow_mut().push(agent_id));
        Self { _private: () }
    }
}

impl Drop for AgentScope {
    fn drop(&mut self) {
        AGENT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_nest_and_unwind() {
        let outer = Uuid::new_v4();
        let inner = Uuid::new_v4();

        assert_eq!(current_agent_id(), None);

        let _outer_scope = AgentScope::enter(outer);
        assert_eq!(current_agent_id(), Some(outer));

        {
            let _inner_scope = AgentScope::enter(inner);
            assert_eq!(current_agent_id(), Some(inner));
        }

        assert_eq!(current_agent_id(), Some(outer));
    }

    #[test]
    fn context_is_per_thread() {
        let agent = Uuid::new_v4();
        let _scope = AgentScope::enter(agent);

        let seen = std::thread::spawn(current_agent_id).join().unwrap();
        assert_eq!(seen, None);
        assert_eq!(current_agent_id(), Some(agent));
    }
}
