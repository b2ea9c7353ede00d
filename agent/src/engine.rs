//! Decision engine orchestrator.
//!
//! Drives one inbound message through the fixed pipeline:
//!
//! `Start -> CheckPending -> Classify -> Resolve (if needed) -> Decide ->
//! Execute (sequential) -> Compose -> Emit`
//!
//! The engine is stateless across invocations: everything it needs
//! arrives in the [`DecisionContext`], and the only cross-invocation
//! state, the pending confirmation, lives in the externally-owned
//! [`PendingStore`]. Tool calls execute strictly in sequence with
//! early-exit on the first failure; there is no retry and no rollback.
//! Every executed call yields one [`ToolInvocationRecord`] and every
//! invocation yields one [`DecisionRecord`].

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{DecisionRecord, ToolInvocationRecord};
use crate::classifier::IntentClassifier;
use crate::composer;
use crate::config::AgentConfig;
use crate::pending::{Clock, PendingState, PendingStore};
use crate::policy::{self, PolicyEnv};
use crate::resolver;
use crate::tools::ToolExecutor;
use crate::types::{
    AgentDecision, ClassifiedIntent, DecisionContext, Intent, IntentTag, TaskSnapshot, ToolCall,
};

/// Everything one invocation produces: the decision, the audit trail,
/// and the user-facing text.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub decision: AgentDecision,
    pub records: Vec<ToolInvocationRecord>,
    pub decision_record: DecisionRecord,
    pub response_text: String,
}

/// The agent decision engine. One instance serves many conversations;
/// invocations are independent and hold no shared mutable state beyond
/// the injected boundaries.
pub struct DecisionEngine {
    classifier: Arc<dyn IntentClassifier>,
    tools: Arc<dyn ToolExecutor>,
    pending: Arc<dyn PendingStore>,
    clock: Arc<dyn Clock>,
    config: AgentConfig,
}

impl DecisionEngine {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        tools: Arc<dyn ToolExecutor>,
        pending: Arc<dyn PendingStore>,
        clock: Arc<dyn Clock>,
        config: AgentConfig,
    ) -> Self {
        Self {
            classifier,
            tools,
            pending,
            clock,
            config,
        }
    }

    /// Process one inbound message. Always returns a decision; every
    /// failure mode is resolved internally into user-facing behavior.
    pub async fn process(&self, context: &DecisionContext) -> EngineOutput {
        let message_id = Uuid::new_v4().to_string();

        // Authentication short-circuits before classification.
        let user_id = match context.user_id.as_deref().filter(|u| !u.is_empty()) {
            Some(user_id) => user_id.to_string(),
            None => {
                let decision = AgentDecision::RespondOnly {
                    text: composer::auth_required(),
                };
                let text = composer::auth_required();
                return self.emit(context, &message_id, None, decision, Vec::new(), text);
            }
        };

        if context.message.chars().count() > self.config.max_message_len {
            let decision = AgentDecision::RespondOnly {
                text: composer::invalid_input(),
            };
            let text = composer::invalid_input();
            return self.emit(context, &message_id, None, decision, Vec::new(), text);
        }

        let now = self.clock.now();

        // CheckPending: expiry is evaluated before anything else. An
        // expired action is silently dropped and the message reprocessed
        // as if nothing was pending.
        let stored = match &context.pending {
            Some(action) => Some(action.clone()),
            None => match self.pending.get(&context.conversation_id).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(error = %e, "pending store read failed, treating as no pending");
                    None
                }
            },
        };
        let was_stored = stored.is_some();
        let mut state = PendingState::evaluate(stored, now);
        if was_stored && !state.is_pending() {
            info!(conversation = %context.conversation_id, "pending confirmation expired");
            self.clear_pending(&context.conversation_id).await;
        }

        // Classify.
        let classified = self
            .classifier
            .classify(&context.message, &context.history)
            .await;
        let intent_tag = classified.intent.tag();

        // Any non-confirmation message cancels an outstanding
        // confirmation before normal processing continues.
        if state.is_pending()
            && !matches!(classified.intent, Intent::ConfirmYes | Intent::ConfirmNo)
        {
            info!(
                conversation = %context.conversation_id,
                "pending confirmation cancelled by new message"
            );
            self.clear_pending(&context.conversation_id).await;
            state = PendingState::NoPending;
        }

        let env = PolicyEnv {
            user_id: &user_id,
            message: &context.message,
            now,
            config: &self.config,
            tasks: &[],
        };
        let decision = policy::decide(&classified.intent, &state, None, &env);

        let mut records = Vec::new();
        let (decision, text) = match decision {
            AgentDecision::ExecutePending { calls } => {
                // Confirmed delete: execute, then consume the pending
                // action regardless of outcome (a confirmation is spent
                // once acted on).
                let results = self
                    .execute_calls(context, &message_id, &user_id, intent_tag, &calls, 0, &mut records)
                    .await;
                self.clear_pending(&context.conversation_id).await;
                let text = match results {
                    Ok(results) => render_success(&calls, &results),
                    Err(()) => composer::tool_failure(),
                };
                (AgentDecision::ExecutePending { calls }, text)
            }
            AgentDecision::CancelPending { text } => {
                self.clear_pending(&context.conversation_id).await;
                (AgentDecision::CancelPending { text: text.clone() }, text)
            }
            AgentDecision::InvokeTool { calls } if classified.intent.references_task() => {
                self.resolve_and_finalize(
                    context,
                    &message_id,
                    &user_id,
                    &classified,
                    &state,
                    now,
                    calls,
                    &mut records,
                )
                .await
            }
            AgentDecision::InvokeTool { calls } => {
                let results = self
                    .execute_calls(context, &message_id, &user_id, intent_tag, &calls, 0, &mut records)
                    .await;
                let text = match results {
                    Ok(results) => render_success(&calls, &results),
                    Err(()) => composer::tool_failure(),
                };
                (AgentDecision::InvokeTool { calls }, text)
            }
            AgentDecision::RespondOnly { text } => {
                (AgentDecision::RespondOnly { text: text.clone() }, text)
            }
            AgentDecision::AskClarification { question } => (
                AgentDecision::AskClarification {
                    question: question.clone(),
                },
                question,
            ),
            // Confirmations normally arise after resolution; this arm
            // only fires for classifiers that resolve targets themselves.
            AgentDecision::RequestConfirmation { pending, prompt } => {
                self.store_pending(&context.conversation_id, &pending).await;
                (
                    AgentDecision::RequestConfirmation {
                        pending,
                        prompt: prompt.clone(),
                    },
                    prompt,
                )
            }
        };

        self.emit(context, &message_id, Some(intent_tag), decision, records, text)
    }

    /// Phase two for task-referencing intents: run the mandatory
    /// `list_tasks` read, resolve the reference against the displayed
    /// list, and re-decide with the resolution in hand.
    #[allow(clippy::too_many_arguments)]
    async fn resolve_and_finalize(
        &self,
        context: &DecisionContext,
        message_id: &str,
        user_id: &str,
        classified: &ClassifiedIntent,
        state: &PendingState,
        now: chrono::DateTime<chrono::Utc>,
        list_calls: Vec<ToolCall>,
        records: &mut Vec<ToolInvocationRecord>,
    ) -> (AgentDecision, String) {
        let intent_tag = classified.intent.tag();
        let results = self
            .execute_calls(context, message_id, user_id, intent_tag, &list_calls, 0, records)
            .await;
        let list_result = match results {
            Ok(mut results) => results.pop().unwrap_or(JsonValue::Null),
            Err(()) => {
                return (
                    AgentDecision::InvokeTool { calls: list_calls },
                    composer::tool_failure(),
                )
            }
        };

        let tasks = TaskSnapshot::from_list_result(&list_result);
        let reference = match &classified.intent {
            Intent::CompleteTask { reference }
            | Intent::UpdateTask { reference, .. }
            | Intent::DeleteTask { reference } => reference.as_str(),
            _ => "",
        };
        let resolution = resolver::resolve(reference, &tasks);

        let env = PolicyEnv {
            user_id,
            message: &context.message,
            now,
            config: &self.config,
            tasks: &tasks,
        };
        let decision = policy::decide(&classified.intent, state, Some(&resolution), &env);

        match decision {
            AgentDecision::InvokeTool { calls } => {
                // The seq-1 read already ran; execute only the appended
                // mutation.
                let executed = list_calls.len();
                let results = self
                    .execute_calls(context, message_id, user_id, intent_tag, &calls, executed, records)
                    .await;
                let text = match results {
                    Ok(results) => render_success(&calls, &results),
                    Err(()) => composer::tool_failure(),
                };
                (AgentDecision::InvokeTool { calls }, text)
            }
            AgentDecision::AskClarification { question } => (
                AgentDecision::AskClarification {
                    question: question.clone(),
                },
                question,
            ),
            AgentDecision::RequestConfirmation { pending, prompt } => {
                self.store_pending(&context.conversation_id, &pending).await;
                (
                    AgentDecision::RequestConfirmation {
                        pending,
                        prompt: prompt.clone(),
                    },
                    prompt,
                )
            }
            AgentDecision::RespondOnly { text } => {
                (AgentDecision::RespondOnly { text: text.clone() }, text)
            }
            other => {
                // ExecutePending/CancelPending cannot arise from a
                // resolution re-decide.
                warn!(decision = other.tag(), "unexpected decision after resolution");
                (other, composer::fallback())
            }
        }
    }

    /// Execute `calls[skip..]` strictly in order, recording one audit
    /// fact per call. Halts on the first failure; already-succeeded
    /// calls are not rolled back.
    #[allow(clippy::too_many_arguments)]
    async fn execute_calls(
        &self,
        context: &DecisionContext,
        message_id: &str,
        user_id: &str,
        intent: IntentTag,
        calls: &[ToolCall],
        skip: usize,
        records: &mut Vec<ToolInvocationRecord>,
    ) -> Result<Vec<JsonValue>, ()> {
        let mut results = Vec::new();
        for call in &calls[skip..] {
            let invoked_at = self.clock.now();
            let started = Instant::now();
            let outcome = self.tools.execute(call).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            records.push(ToolInvocationRecord::new(
                &context.conversation_id,
                message_id,
                user_id,
                call,
                intent,
                outcome.success.then(|| outcome.result.clone()),
                outcome.success,
                outcome.error.clone(),
                invoked_at,
                duration_ms,
            ));

            if !outcome.success {
                warn!(
                    tool = %call.name,
                    sequence = call.sequence,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "tool call failed, halting sequence"
                );
                return Err(());
            }
            results.push(outcome.result);
        }
        Ok(results)
    }

    async fn store_pending(&self, conversation_id: &str, action: &crate::types::PendingAction) {
        if let Err(e) = self.pending.set(conversation_id, action.clone()).await {
            warn!(error = %e, "failed to store pending confirmation");
        }
    }

    async fn clear_pending(&self, conversation_id: &str) {
        if let Err(e) = self.pending.clear(conversation_id).await {
            warn!(error = %e, "failed to clear pending confirmation");
        }
    }

    fn emit(
        &self,
        context: &DecisionContext,
        message_id: &str,
        intent: Option<IntentTag>,
        decision: AgentDecision,
        records: Vec<ToolInvocationRecord>,
        response_text: String,
    ) -> EngineOutput {
        let decision_record = DecisionRecord {
            id: Uuid::new_v4(),
            conversation_id: context.conversation_id.clone(),
            message_id: message_id.to_string(),
            user_id: context.user_id.clone(),
            intent_classification: intent,
            decision: decision.tag().to_string(),
            tool_call_count: decision.tool_calls().len(),
            decided_at: self.clock.now(),
        };
        info!(
            conversation = %context.conversation_id,
            intent = intent.map(|t| t.as_str()).unwrap_or("-"),
            decision = decision.tag(),
            tool_calls = decision.tool_calls().len(),
            "decision emitted"
        );
        EngineOutput {
            decision,
            records,
            decision_record,
            response_text,
        }
    }
}

/// Render the success text for an executed call sequence from the final
/// call's operation and result.
fn render_success(calls: &[ToolCall], results: &[JsonValue]) -> String {
    match (calls.last(), results.last()) {
        (Some(call), Some(result)) => composer::tool_results(call.name, result),
        _ => composer::fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PatternClassifier;
    use crate::pending::{InMemoryPendingStore, ManualClock};
    use crate::tools::InMemoryTaskStore;
    use chrono::Utc;

    fn engine() -> DecisionEngine {
        DecisionEngine::new(
            Arc::new(PatternClassifier::new()),
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryPendingStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
            AgentConfig::default(),
        )
    }

    #[tokio::test]
    async fn missing_user_short_circuits_before_classification() {
        let engine = engine();
        let mut context = DecisionContext::new("u-1", "remind me to buy milk", "c-1");
        context.user_id = None;

        let output = engine.process(&context).await;
        assert!(output.records.is_empty());
        assert!(output.decision.tool_calls().is_empty());
        assert_eq!(output.response_text, composer::auth_required());
        assert_eq!(output.decision_record.intent_classification, None);
    }

    #[tokio::test]
    async fn oversized_message_is_rejected_without_tools() {
        let engine = engine();
        let context = DecisionContext::new("u-1", "x".repeat(4001), "c-1");

        let output = engine.process(&context).await;
        assert!(output.records.is_empty());
        assert_eq!(output.response_text, composer::invalid_input());
    }

    #[tokio::test]
    async fn every_executed_call_is_recorded() {
        let engine = engine();
        let context = DecisionContext::new("u-1", "remind me to buy milk", "c-1");

        let output = engine.process(&context).await;
        assert_eq!(output.records.len(), 1);
        let record = &output.records[0];
        assert_eq!(record.tool_name, "add_task");
        assert!(record.success);
        assert_eq!(record.intent_classification, IntentTag::CreateTask);
        assert_eq!(record.conversation_id, "c-1");
        assert_eq!(output.decision_record.tool_call_count, 1);
    }
}
