//! Pending-confirmation state machine and store boundary.
//!
//! A conversation is either `NoPending` or holds exactly one
//! `PendingConfirmation`. The action record itself lives in an external
//! keyed store; the engine only reads it and instructs writes. Expiry has
//! no timer; it is evaluated lazily at the start of every invocation
//! that touches the conversation, against an injected [`Clock`].
//!
//! Transitions:
//! - `NoPending --(DeleteTask decision)--> PendingConfirmation`
//! - `PendingConfirmation --(ConfirmYes before expiry)--> NoPending`,
//!   executing the pending delete
//! - `PendingConfirmation --(ConfirmNo)--> NoPending`, cancel only
//! - `PendingConfirmation --(expired, any message)--> NoPending`, the
//!   message is reprocessed as if nothing was pending
//! - `PendingConfirmation --(any non-confirmation message)--> NoPending`,
//!   cancel-and-reprocess

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::errors::AgentError;
use crate::types::PendingAction;

/// Wall-clock source, injectable so tests control expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replay.
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock lock") = now;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().expect("clock lock");
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

/// Confirmation state of one conversation at invocation start.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingState {
    NoPending,
    PendingConfirmation(PendingAction),
}

impl PendingState {
    /// Evaluate the stored action against the clock: an expired action is
    /// `NoPending`, never executed, even for an immediate "yes".
    pub fn evaluate(stored: Option<PendingAction>, now: DateTime<Utc>) -> Self {
        match stored {
            Some(action) if !action.is_expired(now) => PendingState::PendingConfirmation(action),
            _ => PendingState::NoPending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PendingState::PendingConfirmation(_))
    }
}

/// Externally-owned keyed store: conversation id to at most one pending
/// action. Callers serialize access per conversation.
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn get(&self, conversation_id: &str) -> Result<Option<PendingAction>, AgentError>;
    async fn set(&self, conversation_id: &str, action: PendingAction) -> Result<(), AgentError>;
    async fn clear(&self, conversation_id: &str) -> Result<(), AgentError>;
}

/// In-memory store for tests and the demo binary.
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    entries: DashMap<String, PendingAction>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for InMemoryPendingStore {
    async fn get(&self, conversation_id: &str) -> Result<Option<PendingAction>, AgentError> {
        Ok(self.entries.get(conversation_id).map(|e| e.value().clone()))
    }

    async fn set(&self, conversation_id: &str, action: PendingAction) -> Result<(), AgentError> {
        self.entries.insert(conversation_id.to_string(), action);
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), AgentError> {
        self.entries.remove(conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn action(now: DateTime<Utc>) -> PendingAction {
        PendingAction::delete("t-1", "call mom", now, Duration::minutes(5))
    }

    #[test]
    fn live_action_is_pending() {
        let now = Utc::now();
        let state = PendingState::evaluate(Some(action(now)), now + Duration::minutes(4));
        assert!(state.is_pending());
    }

    #[test]
    fn expired_action_is_no_pending() {
        let now = Utc::now();
        let state = PendingState::evaluate(Some(action(now)), now + Duration::minutes(6));
        assert_eq!(state, PendingState::NoPending);
    }

    #[test]
    fn absent_action_is_no_pending() {
        assert_eq!(PendingState::evaluate(None, Utc::now()), PendingState::NoPending);
    }

    #[tokio::test]
    async fn store_holds_one_action_per_conversation() {
        let store = InMemoryPendingStore::new();
        let now = Utc::now();
        store.set("c-1", action(now)).await.unwrap();
        let replacement = PendingAction::delete("t-2", "buy milk", now, Duration::minutes(5));
        store.set("c-1", replacement.clone()).await.unwrap();

        let stored = store.get("c-1").await.unwrap().unwrap();
        assert_eq!(stored, replacement);

        store.clear("c-1").await.unwrap();
        assert!(store.get("c-1").await.unwrap().is_none());
    }
}
