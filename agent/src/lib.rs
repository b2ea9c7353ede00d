//! Agent decision engine for a task-management assistant.
//!
//! Turns one inbound chat message into an explicit, auditable decision:
//! which task operations to invoke (if any), whether a destructive action
//! needs confirmation first, and what to say back. The core pipeline is
//! deterministic by construction (a pattern classifier, a pure decision
//! policy, and fixed response templates), so the same message against the
//! same state always produces the same decision.
//!
//! The moving parts are injected at the boundaries:
//!
//! - [`classifier::IntentClassifier`] maps message text to a closed
//!   intent set
//! - [`tools::ToolExecutor`] runs the five fixed task operations
//! - [`pending::PendingStore`] holds the one pending confirmation a
//!   conversation may have
//! - [`pending::Clock`] supplies time, so expiry is testable
//!
//! [`engine::DecisionEngine`] wires them together and emits audit records
//! for every decision and every executed tool call.

pub mod audit;
pub mod classifier;
pub mod composer;
pub mod config;
pub mod engine;
pub mod errors;
pub mod pending;
pub mod policy;
pub mod resolver;
pub mod tools;
pub mod types;

pub use audit::{DecisionRecord, ToolInvocationRecord};
pub use classifier::{IntentClassifier, PatternClassifier};
pub use config::AgentConfig;
pub use engine::{DecisionEngine, EngineOutput};
pub use errors::AgentError;
pub use pending::{Clock, InMemoryPendingStore, ManualClock, PendingState, PendingStore, SystemClock};
pub use resolver::{resolve, Resolution};
pub use tools::{InMemoryTaskStore, ToolExecutor, ToolOutcome};
pub use types::{
    AgentDecision, ClassifiedIntent, DecisionContext, Intent, IntentTag, Message, MessageRole,
    PendingAction, PendingKind, TaskSnapshot, ToolCall, ToolName,
};
