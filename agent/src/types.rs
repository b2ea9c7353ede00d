//! Core data model for the agent decision engine.
//!
//! Every type here is a closed tagged variant or an immutable value object.
//! The engine never dispatches on free-form category strings: intents,
//! decisions and tool operations are all explicit enums carrying only the
//! fields valid for their tag. All types serialize with `serde` so that
//! decisions can be compared byte-for-byte in determinism tests.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Sender of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp,
        }
    }
}

/// Bare intent tag, without any variant payload.
///
/// Used where only the category matters: ambiguity candidate lists and
/// audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentTag {
    CreateTask,
    ListTasks,
    CompleteTask,
    UpdateTask,
    DeleteTask,
    GeneralChat,
    Ambiguous,
    ConfirmYes,
    ConfirmNo,
}

impl IntentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentTag::CreateTask => "CREATE_TASK",
            IntentTag::ListTasks => "LIST_TASKS",
            IntentTag::CompleteTask => "COMPLETE_TASK",
            IntentTag::UpdateTask => "UPDATE_TASK",
            IntentTag::DeleteTask => "DELETE_TASK",
            IntentTag::GeneralChat => "GENERAL_CHAT",
            IntentTag::Ambiguous => "AMBIGUOUS",
            IntentTag::ConfirmYes => "CONFIRM_YES",
            IntentTag::ConfirmNo => "CONFIRM_NO",
        }
    }

    /// Parse a raw tag string from an external classifier.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CREATE_TASK" => Some(IntentTag::CreateTask),
            "LIST_TASKS" => Some(IntentTag::ListTasks),
            "COMPLETE_TASK" => Some(IntentTag::CompleteTask),
            "UPDATE_TASK" => Some(IntentTag::UpdateTask),
            "DELETE_TASK" => Some(IntentTag::DeleteTask),
            "GENERAL_CHAT" => Some(IntentTag::GeneralChat),
            "AMBIGUOUS" => Some(IntentTag::Ambiguous),
            "CONFIRM_YES" => Some(IntentTag::ConfirmYes),
            "CONFIRM_NO" => Some(IntentTag::ConfirmNo),
        _ => None,
        }
    }
}

/// Classified purpose of one user message, with variant-specific payload.
///
/// Extraction rules: `CreateTask` carries the task content with leading
/// filler stripped; the task-referencing variants carry the reference text
/// unmodified for the resolver to interpret; `Ambiguous` carries the
/// candidate intents it could not distinguish between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    CreateTask {
        description: String,
    },
    ListTasks,
    CompleteTask {
        reference: String,
    },
    UpdateTask {
        reference: String,
        new_description: String,
    },
    DeleteTask {
        reference: String,
    },
    GeneralChat,
    Ambiguous {
        candidates: Vec<IntentTag>,
    },
    ConfirmYes,
    ConfirmNo,
}

impl Intent {
    pub fn tag(&self) -> IntentTag {
        match self {
            Intent::CreateTask { .. } => IntentTag::CreateTask,
            Intent::ListTasks => IntentTag::ListTasks,
            Intent::CompleteTask { .. } => IntentTag::CompleteTask,
            Intent::UpdateTask { .. } => IntentTag::UpdateTask,
            Intent::DeleteTask { .. } => IntentTag::DeleteTask,
            Intent::GeneralChat => IntentTag::GeneralChat,
            Intent::Ambiguous { .. } => IntentTag::Ambiguous,
            Intent::ConfirmYes => IntentTag::ConfirmYes,
            Intent::ConfirmNo => IntentTag::ConfirmNo,
        }
    }

    /// True for intents that reference an existing task and therefore need
    /// a `list_tasks` read before any mutation.
    pub fn references_task(&self) -> bool {
        matches!(
            self,
            Intent::CompleteTask { .. } | Intent::UpdateTask { .. } | Intent::DeleteTask { .. }
        )
    }
}

/// Classification result for one message: intent plus optional confidence.
///
/// Lifetime is one engine invocation; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedIntent {
    pub intent: Intent,
    /// Classification confidence in `[0.0, 1.0]`, when the source reports one.
    pub confidence: Option<f64>,
}

impl ClassifiedIntent {
    pub fn new(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence: Some(confidence.clamp(0.0, 1.0)),
        }
    }
}

/// Kind of action a pending confirmation gates. Only task deletion is
/// irreversible enough to need one today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    DeleteTask,
}

/// One outstanding destructive-action confirmation.
///
/// At most one exists per conversation at any time. Created by a
/// `DeleteTask` decision; cleared by confirmation, denial, expiry, or any
/// new non-confirmation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: PendingKind,
    pub task_id: String,
    pub task_description: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingAction {
    /// Build a delete confirmation expiring `ttl` after `now`.
    pub fn delete(
        task_id: impl Into<String>,
        task_description: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            kind: PendingKind::DeleteTask,
            task_id: task_id.into(),
            task_description: task_description.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Immutable input to one engine invocation.
///
/// The engine holds no memory across invocations; everything it needs is
/// constructed fresh by the caller and passed in here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Authenticated user identifier. `None` short-circuits the pipeline
    /// with a fixed authentication-required response.
    pub user_id: Option<String>,
    /// Current user message, bounded by `AgentConfig::max_message_len`.
    pub message: String,
    pub conversation_id: String,
    /// Ordered recent history, oldest first.
    pub history: Vec<Message>,
    /// Outstanding confirmation for this conversation, if any.
    pub pending: Option<PendingAction>,
}

impl DecisionContext {
    pub fn new(
        user_id: impl Into<String>,
        message: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: Some(user_id.into()),
            message: message.into(),
            conversation_id: conversation_id.into(),
            history: Vec::new(),
            pending: None,
        }
    }
}

/// The five fixed task-store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    AddTask,
    ListTasks,
    UpdateTask,
    CompleteTask,
    DeleteTask,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::AddTask => "add_task",
            ToolName::ListTasks => "list_tasks",
            ToolName::UpdateTask => "update_task",
            ToolName::CompleteTask => "complete_task",
            ToolName::DeleteTask => "delete_task",
        }
    }

    /// Whether this operation mutates the task store.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, ToolName::ListTasks)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One task-operation invocation request.
///
/// Parameters use an insertion-ordered map so serialized decisions are
/// byte-stable. Sequence numbers within one decision are contiguous from 1
/// and fix the strict execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: ToolName,
    pub parameters: IndexMap<String, JsonValue>,
    pub sequence: u32,
}

impl ToolCall {
    /// Build a call with the mandatory `user_id` parameter first.
    pub fn new(name: ToolName, user_id: &str, sequence: u32) -> Self {
        let mut parameters = IndexMap::new();
        parameters.insert("user_id".to_string(), JsonValue::String(user_id.to_string()));
        Self {
            name,
            parameters,
            sequence,
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

/// Read-only view of one task as returned by `list_tasks`, in display
/// order. This is what the resolver matches references against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub description: String,
    pub completed: bool,
}

impl TaskSnapshot {
    /// Extract the displayed task list from a `list_tasks` result payload.
    /// Malformed entries are skipped rather than failing the invocation.
    pub fn from_list_result(result: &JsonValue) -> Vec<TaskSnapshot> {
        result
            .get("tasks")
            .and_then(JsonValue::as_array)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter_map(|t| {
                        Some(TaskSnapshot {
                            id: t.get("id")?.as_str()?.to_string(),
                            description: t.get("description")?.as_str()?.to_string(),
                            completed: t.get("completed").and_then(JsonValue::as_bool).unwrap_or(false),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The engine's deterministic output for one message.
///
/// Consumed immediately by the orchestrator and response composer; only
/// its effects are persisted, via audit records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentDecision {
    /// Invoke the listed tool calls strictly in sequence order.
    InvokeTool { calls: Vec<ToolCall> },
    /// Answer conversationally with no side effects.
    RespondOnly { text: String },
    /// Ask the user a clarifying question; no tool calls.
    AskClarification { question: String },
    /// Propose a destructive action and wait for yes/no.
    RequestConfirmation {
        pending: PendingAction,
        prompt: String,
    },
    /// Run the previously confirmed action.
    ExecutePending { calls: Vec<ToolCall> },
    /// Drop the pending action without executing it.
    CancelPending { text: String },
}

impl AgentDecision {
    pub fn tag(&self) -> &'static str {
        match self {
            AgentDecision::InvokeTool { .. } => "INVOKE_TOOL",
            AgentDecision::RespondOnly { .. } => "RESPOND_ONLY",
            AgentDecision::AskClarification { .. } => "ASK_CLARIFICATION",
            AgentDecision::RequestConfirmation { .. } => "REQUEST_CONFIRMATION",
            AgentDecision::ExecutePending { .. } => "EXECUTE_PENDING",
            AgentDecision::CancelPending { .. } => "CANCEL_PENDING",
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            AgentDecision::InvokeTool { calls } | AgentDecision::ExecutePending { calls } => calls,
            _ => &[],
        }
    }

    /// Check the structural invariants a well-formed decision must hold:
    /// only `InvokeTool`/`ExecutePending` carry calls, sequences are
    /// contiguous from 1, every call names its user, and mutations other
    /// than `add_task` are preceded by a `list_tasks` read in the same
    /// sequence (delete executes via a previously confirmed pending
    /// action, so `ExecutePending` is exempt from the read requirement).
    pub fn check_invariants(&self) -> Result<(), String> {
        let calls = self.tool_calls();
        if calls.is_empty() {
            if matches!(self, AgentDecision::InvokeTool { .. }) {
                return Err("INVOKE_TOOL decision must include tool calls".to_string());
            }
            return Ok(());
        }
        if !matches!(
            self,
            AgentDecision::InvokeTool { .. } | AgentDecision::ExecutePending { .. }
        ) {
            return Err(format!("{} decision must not include tool calls", self.tag()));
        }

        let mut listed = false;
        for (i, call) in calls.iter().enumerate() {
            if call.sequence != (i as u32) + 1 {
                return Err(format!(
                    "tool call sequence must be contiguous from 1, found {} at index {}",
                    call.sequence, i
                ));
            }
            if !call.parameters.contains_key("user_id") {
                return Err(format!("{} call is missing user_id", call.name));
            }
            match call.name {
                ToolName::ListTasks => listed = true,
                ToolName::AddTask => {}
                ToolName::CompleteTask | ToolName::UpdateTask | ToolName::DeleteTask => {
                    let confirmed = matches!(self, AgentDecision::ExecutePending { .. });
                    if !listed && !confirmed {
                        return Err(format!(
                            "{} requires a preceding list_tasks in the same decision",
                            call.name
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_tag_round_trips() {
        for tag in [
            IntentTag::CreateTask,
            IntentTag::ListTasks,
            IntentTag::CompleteTask,
            IntentTag::UpdateTask,
            IntentTag::DeleteTask,
            IntentTag::GeneralChat,
            IntentTag::Ambiguous,
            IntentTag::ConfirmYes,
            IntentTag::ConfirmNo,
        ] {
            assert_eq!(IntentTag::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(IntentTag::parse("DROP_TABLE"), None);
    }

    #[test]
    fn tool_call_carries_user_id_first() {
        let call = ToolCall::new(ToolName::AddTask, "u-1", 1).with_param("description", "x");
        let keys: Vec<&String> = call.parameters.keys().collect();
        assert_eq!(keys[0], "user_id");
    }

    #[test]
    fn mutation_without_read_is_rejected() {
        let decision = AgentDecision::InvokeTool {
            calls: vec![ToolCall::new(ToolName::CompleteTask, "u-1", 1).with_param("task_id", "t")],
        };
        assert!(decision.check_invariants().is_err());
    }

    #[test]
    fn read_then_mutation_is_accepted() {
        let decision = AgentDecision::InvokeTool {
            calls: vec![
                ToolCall::new(ToolName::ListTasks, "u-1", 1),
                ToolCall::new(ToolName::CompleteTask, "u-1", 2).with_param("task_id", "t"),
            ],
        };
        assert!(decision.check_invariants().is_ok());
    }

    #[test]
    fn confirmed_delete_is_exempt_from_read_requirement() {
        let decision = AgentDecision::ExecutePending {
            calls: vec![ToolCall::new(ToolName::DeleteTask, "u-1", 1).with_param("task_id", "t")],
        };
        assert!(decision.check_invariants().is_ok());
    }

    #[test]
    fn non_contiguous_sequence_is_rejected() {
        let decision = AgentDecision::InvokeTool {
            calls: vec![
                ToolCall::new(ToolName::ListTasks, "u-1", 1),
                ToolCall::new(ToolName::CompleteTask, "u-1", 3).with_param("task_id", "t"),
            ],
        };
        assert!(decision.check_invariants().is_err());
    }

    #[test]
    fn pending_action_expiry() {
        let now = Utc::now();
        let pending = PendingAction::delete("t-1", "call mom", now, Duration::minutes(5));
        assert!(!pending.is_expired(now));
        assert!(!pending.is_expired(now + Duration::minutes(5)));
        assert!(pending.is_expired(now + Duration::minutes(5) + Duration::seconds(1)));
    }

    #[test]
    fn snapshot_parsing_skips_malformed_entries() {
        let result = serde_json::json!({
            "tasks": [
                {"id": "a", "description": "buy groceries", "completed": false},
                {"description": "missing id"},
                {"id": "b", "description": "call mom", "completed": true},
            ]
        });
        let tasks = TaskSnapshot::from_list_result(&result);
        assert_eq!(tasks.len(), 2);
        assert!(tasks[1].completed);
    }
}
