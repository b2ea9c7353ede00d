//! Audit records.
//!
//! Two immutable facts come out of every invocation: one
//! [`ToolInvocationRecord`] per tool call that actually executed, written
//! after the call returns (success or failure, never before), and one
//! [`DecisionRecord`] for the decision itself. Retention and querying
//! live outside this crate; the engine only produces the facts.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::types::{IntentTag, ToolCall};

/// Immutable audit fact for one executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub id: Uuid,
    pub conversation_id: String,
    /// The inbound message that triggered this call.
    pub message_id: String,
    pub user_id: String,
    pub tool_name: String,
    pub parameters: IndexMap<String, JsonValue>,
    /// The classification that led to this call.
    pub intent_classification: IntentTag,
    pub result: Option<JsonValue>,
    pub success: bool,
    pub error_message: Option<String>,
    pub invoked_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ToolInvocationRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversation_id: &str,
        message_id: &str,
        user_id: &str,
        call: &ToolCall,
        intent: IntentTag,
        result: Option<JsonValue>,
        success: bool,
        error_message: Option<String>,
        invoked_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.to_string(),
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
            tool_name: call.name.as_str().to_string(),
            parameters: call.parameters.clone(),
            intent_classification: intent,
            result,
            success,
            error_message,
            invoked_at,
            duration_ms,
        }
    }
}

/// Decision-level audit fact: what the engine decided for one message and
/// how many tool calls that decision carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub conversation_id: String,
    pub message_id: String,
    pub user_id: Option<String>,
    pub intent_classification: Option<IntentTag>,
    pub decision: String,
    pub tool_call_count: usize,
    pub decided_at: DateTime<Utc>,
}
