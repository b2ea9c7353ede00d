//! Decision policy.
//!
//! A pure mapping from (classified intent, pending-confirmation state,
//! resolved reference) to a decision variant. All safety rules live here:
//!
//! - destructive actions are never executed in the decision that first
//!   proposes them; delete always goes through `RequestConfirmation`
//! - `complete_task`, `update_task` and `delete_task` never appear
//!   without a `list_tasks` read earlier in the same decision, except
//!   when the target was already confirmed via a `PendingAction`
//! - general chat and ambiguous classifications never produce tool calls
//!
//! Task-referencing intents are decided in two phases. The first call
//! (`resolution == None`) yields the mandatory `list_tasks` read; after
//! the orchestrator executes it and resolves the reference, the second
//! call yields the final decision.

use chrono::{DateTime, Utc};

use crate::composer;
use crate::config::AgentConfig;
use crate::pending::PendingState;
use crate::resolver::Resolution;
use crate::types::{AgentDecision, Intent, TaskSnapshot, ToolCall, ToolName};

/// Immutable inputs the policy needs besides the intent itself.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEnv<'a> {
    pub user_id: &'a str,
    /// Raw message text, used only to pick general-chat wording.
    pub message: &'a str,
    pub now: DateTime<Utc>,
    pub config: &'a AgentConfig,
    /// The displayed task list, populated once `list_tasks` has run.
    pub tasks: &'a [TaskSnapshot],
}

/// Map one classified intent to a decision. Pure: same inputs, same
/// decision.
pub fn decide(
    intent: &Intent,
    pending: &PendingState,
    resolution: Option<&Resolution>,
    env: &PolicyEnv<'_>,
) -> AgentDecision {
    // Rule 1: an outstanding confirmation outranks everything else.
    if let PendingState::PendingConfirmation(action) = pending {
        match intent {
            Intent::ConfirmYes => {
                return AgentDecision::ExecutePending {
                    calls: vec![ToolCall::new(ToolName::DeleteTask, env.user_id, 1)
                        .with_param("task_id", action.task_id.clone())],
                };
            }
            Intent::ConfirmNo => {
                return AgentDecision::CancelPending {
                    text: composer::delete_cancelled(),
                };
            }
            // Anything else cancels the pending action; the orchestrator
            // clears the store and the new intent is handled below as if
            // nothing was pending.
            _ => {}
        }
    }

    match intent {
        // Rule 2: conversational messages have no side effects, ever.
        Intent::GeneralChat => AgentDecision::RespondOnly {
            text: composer::general_reply(env.message),
        },

        // Rule 3: ambiguity asks, never guesses.
        Intent::Ambiguous { candidates } => AgentDecision::AskClarification {
            question: composer::ambiguous_intent(candidates),
        },

        // Rule 4: creation is the one mutation allowed without a read.
        Intent::CreateTask { description } => decide_create(description, env),

        // Rule 5: plain listing.
        Intent::ListTasks => AgentDecision::InvokeTool {
            calls: vec![ToolCall::new(ToolName::ListTasks, env.user_id, 1)],
        },

        // Rule 6: read-resolve-mutate for complete and update.
        Intent::CompleteTask { reference } => {
            decide_referencing(reference, resolution, env, |task| {
                ToolCall::new(ToolName::CompleteTask, env.user_id, 2)
                    .with_param("task_id", task.id.clone())
            })
        }
        Intent::UpdateTask {
            reference,
            new_description,
        } => {
            if new_description.trim().is_empty() {
                return AgentDecision::AskClarification {
                    question: composer::missing_description(),
                };
            }
            if new_description.len() > env.config.max_task_description_len {
                return AgentDecision::RespondOnly {
                    text: composer::description_too_long(env.config.max_task_description_len),
                };
            }
            decide_referencing(reference, resolution, env, |task| {
                ToolCall::new(ToolName::UpdateTask, env.user_id, 2)
                    .with_param("task_id", task.id.clone())
                    .with_param("description", new_description.clone())
            })
        }

        // Rule 7: delete proposes, never executes, in the decision that
        // first names its target.
        Intent::DeleteTask { reference } => decide_delete(reference, resolution, env),

        // A confirmation with nothing pending is just conversation.
        Intent::ConfirmYes | Intent::ConfirmNo => AgentDecision::RespondOnly {
            text: composer::fallback(),
        },
    }
}

fn decide_create(description: &str, env: &PolicyEnv<'_>) -> AgentDecision {
    let description = description.trim();
    if description.is_empty() {
        return AgentDecision::AskClarification {
            question: composer::missing_description(),
        };
    }
    if description.len() > env.config.max_task_description_len {
        return AgentDecision::RespondOnly {
            text: composer::description_too_long(env.config.max_task_description_len),
        };
    }
    AgentDecision::InvokeTool {
        calls: vec![ToolCall::new(ToolName::AddTask, env.user_id, 1)
            .with_param("description", description.to_string())],
    }
}

fn decide_referencing(
    reference: &str,
    resolution: Option<&Resolution>,
    env: &PolicyEnv<'_>,
    mutation: impl Fn(&TaskSnapshot) -> ToolCall,
) -> AgentDecision {
    if reference.trim().is_empty() {
        return AgentDecision::AskClarification {
            question: composer::which_task(),
        };
    }
    match resolution {
        // Phase one: the mandatory read.
        None => AgentDecision::InvokeTool {
            calls: vec![ToolCall::new(ToolName::ListTasks, env.user_id, 1)],
        },
        // Phase two: append the mutation, or truncate to the read and ask.
        Some(Resolution::OneMatch(task)) => AgentDecision::InvokeTool {
            calls: vec![ToolCall::new(ToolName::ListTasks, env.user_id, 1), mutation(task)],
        },
        Some(Resolution::NoMatch) => AgentDecision::AskClarification {
            question: composer::no_task_match(reference, env.tasks),
        },
        Some(Resolution::ManyMatches(matches)) => AgentDecision::AskClarification {
            question: composer::multiple_task_matches(reference, matches),
        },
    }
}

fn decide_delete(
    reference: &str,
    resolution: Option<&Resolution>,
    env: &PolicyEnv<'_>,
) -> AgentDecision {
    if reference.trim().is_empty() {
        return AgentDecision::AskClarification {
            question: composer::which_task(),
        };
    }
    match resolution {
        None => AgentDecision::InvokeTool {
            calls: vec![ToolCall::new(ToolName::ListTasks, env.user_id, 1)],
        },
        Some(Resolution::OneMatch(task)) => {
            let pending = crate::types::PendingAction::delete(
                task.id.clone(),
                task.description.clone(),
                env.now,
                env.config.confirmation_ttl(),
            );
            let prompt = composer::delete_confirmation(&task.description);
            AgentDecision::RequestConfirmation { pending, prompt }
        }
        Some(Resolution::NoMatch) => AgentDecision::AskClarification {
            question: composer::no_task_match(reference, env.tasks),
        },
        Some(Resolution::ManyMatches(matches)) => AgentDecision::AskClarification {
            question: composer::multiple_task_matches(reference, matches),
        },
    }
}
