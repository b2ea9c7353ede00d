//! Response composition.
//!
//! Fixed templates keyed by decision variant and, for tool results, by
//! operation and success flag. Pure formatting only: pluralization, list
//! numbering, candidate rendering. The composer never decides what to do
//! and never leaks tool names, identifiers, or schema details to the
//! user.

use serde_json::Value as JsonValue;

use crate::types::{IntentTag, TaskSnapshot, ToolName};

// Success templates.

pub fn task_created(description: &str) -> String {
    format!("I've added '{}' to your tasks.", description)
}

pub fn tasks_listed(tasks: &[TaskSnapshot]) -> String {
    if tasks.is_empty() {
        return "You don't have any tasks yet.".to_string();
    }
    let mut lines = vec!["Here are your tasks:".to_string()];
    for (i, task) in tasks.iter().enumerate() {
        let marker = if task.completed { "[x]" } else { "[ ]" };
        let state = if task.completed { "completed" } else { "pending" };
        lines.push(format!("{}. {} {} ({})", i + 1, marker, task.description, state));
    }
    lines.push(String::new());
    lines.push(
        "Tip: Use 'complete task 1' or 'delete task 2' to manage tasks by number.".to_string(),
    );
    lines.join("\n")
}

pub fn task_completed(description: &str) -> String {
    format!("Done! '{}' has been marked as completed.", description)
}

pub fn task_updated(old_description: &str, new_description: &str) -> String {
    format!("Updated '{}' to '{}'.", old_description, new_description)
}

pub fn task_deleted(description: &str) -> String {
    format!("'{}' has been deleted.", description)
}

// Clarification templates.

pub fn ambiguous_intent(candidates: &[IntentTag]) -> String {
    let options: Vec<String> = candidates.iter().map(intent_action).collect();
    match options.len() {
        0 | 1 => "I'm not sure what you'd like to do. Could you please clarify?".to_string(),
        2 => format!(
            "I'm not sure what you'd like to do. Would you like to {}, {}, or something else?",
            options[0], options[1]
        ),
        _ => {
            let (last, rest) = options.split_last().expect("non-empty options");
            format!(
                "I'm not sure what you'd like to do. Would you like to {}, or {}?",
                rest.join(", "),
                last
            )
        }
    }
}

fn intent_action(tag: &IntentTag) -> String {
    match tag {
        IntentTag::CreateTask => "add it as a new task".to_string(),
        IntentTag::CompleteTask => "mark an existing task as complete".to_string(),
        IntentTag::UpdateTask => "update an existing task".to_string(),
        IntentTag::DeleteTask => "delete an existing task".to_string(),
        IntentTag::ListTasks => "see your tasks".to_string(),
        other => other.as_str().to_lowercase().replace('_', " "),
    }
}

pub fn no_task_match(reference: &str, tasks: &[TaskSnapshot]) -> String {
    if tasks.is_empty() {
        return format!(
            "I couldn't find a task matching '{}'. You don't have any tasks yet.",
            reference
        );
    }
    let mut lines = vec![format!(
        "I couldn't find a task matching '{}'. Here are your current tasks:",
        reference
    )];
    for (i, task) in tasks.iter().enumerate() {
        let marker = if task.completed { "[x]" } else { "[ ]" };
        lines.push(format!("{}. {} {}", i + 1, marker, task.description));
    }
    lines.join("\n")
}

pub fn multiple_task_matches(reference: &str, matches: &[TaskSnapshot]) -> String {
    let mut lines = vec![format!("I found multiple tasks that match '{}':", reference)];
    for (i, task) in matches.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, task.description));
    }
    lines.push("Which one did you mean?".to_string());
    lines.join("\n")
}

pub fn missing_description() -> String {
    "What would you like the task to say?".to_string()
}

pub fn which_task() -> String {
    "Which task did you mean?".to_string()
}

// Confirmation templates.

pub fn delete_confirmation(description: &str) -> String {
    format!(
        "Are you sure you want to delete '{}'? This cannot be undone. \
         Reply 'yes' to confirm or 'no' to cancel.",
        description
    )
}

pub fn delete_cancelled() -> String {
    "OK, I won't delete that task.".to_string()
}

// Error templates.

pub fn tool_failure() -> String {
    "Sorry, I wasn't able to do that. Please try again.".to_string()
}

pub fn auth_required() -> String {
    "I need you to be logged in to manage tasks.".to_string()
}

pub fn invalid_input() -> String {
    "I didn't understand that. Could you rephrase?".to_string()
}

pub fn description_too_long(limit: usize) -> String {
    format!(
        "That task description is too long. Please keep it under {} characters.",
        limit
    )
}

// General conversation templates.

pub fn greeting() -> String {
    "Hello! How can I help you with your tasks today?".to_string()
}

pub fn capabilities() -> String {
    "I can help you manage your tasks. You can:\n\
     - Add new tasks: 'remind me to buy groceries'\n\
     - See your tasks: 'what are my tasks?'\n\
     - Complete tasks: 'I finished the groceries'\n\
     - Update tasks: 'change groceries to buy milk'\n\
     - Delete tasks: 'delete the groceries task'\n\n\
     What would you like to do?"
        .to_string()
}

pub fn fallback() -> String {
    "I'm here to help you manage your tasks. \
     Is there something task-related I can help you with?"
        .to_string()
}

pub fn out_of_scope() -> String {
    "I can help you manage your tasks - creating, listing, updating, \
     completing, and deleting them. Is there something task-related I can help with?"
        .to_string()
}

const GREETING_WORDS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

const CAPABILITY_PHRASES: &[&str] = &[
    "what can you",
    "help me",
    "how do i",
    "what do you do",
    "what are you",
];

const OUT_OF_SCOPE_TOPICS: &[&str] = &[
    "weather", "news", "stock", "calculate", "translate", "search", "browse", "email", "send",
    "call", "text", "sms",
];

/// Reply for a general-chat message: greeting, capability overview,
/// out-of-scope redirect, or the plain fallback.
pub fn general_reply(message: &str) -> String {
    let lower = message.to_lowercase();
    if GREETING_WORDS.iter().any(|g| lower.contains(g)) {
        return greeting();
    }
    if CAPABILITY_PHRASES.iter().any(|p| lower.contains(p)) {
        return capabilities();
    }
    if OUT_OF_SCOPE_TOPICS.iter().any(|t| lower.contains(t)) {
        return out_of_scope();
    }
    fallback()
}

/// Render the user-facing text for an executed tool sequence, keyed by
/// the final call's operation and its result payload. The caller only
/// invokes this when every call succeeded.
pub fn tool_results(last_tool: ToolName, last_result: &JsonValue) -> String {
    let description = last_result
        .get("description")
        .and_then(JsonValue::as_str)
        .unwrap_or("");
    match last_tool {
        ToolName::AddTask => task_created(description),
        ToolName::ListTasks => tasks_listed(&TaskSnapshot::from_list_result(last_result)),
        ToolName::CompleteTask => task_completed(description),
        ToolName::UpdateTask => task_updated(
            last_result
                .get("old_description")
                .and_then(JsonValue::as_str)
                .unwrap_or(""),
            last_result
                .get("new_description")
                .and_then(JsonValue::as_str)
                .unwrap_or(description),
        ),
        ToolName::DeleteTask => task_deleted(description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(description: &str, completed: bool) -> TaskSnapshot {
        TaskSnapshot {
            id: "t".to_string(),
            description: description.to_string(),
            completed,
        }
    }

    #[test]
    fn listing_numbers_and_marks_tasks() {
        let text = tasks_listed(&[task("buy groceries", false), task("call mom", true)]);
        assert!(text.contains("1. [ ] buy groceries (pending)"));
        assert!(text.contains("2. [x] call mom (completed)"));
        assert!(text.contains("by number"));
    }

    #[test]
    fn empty_listing() {
        assert_eq!(tasks_listed(&[]), "You don't have any tasks yet.");
    }

    #[test]
    fn ambiguous_question_renders_two_candidates() {
        let text = ambiguous_intent(&[IntentTag::CreateTask, IntentTag::CompleteTask]);
        assert!(text.contains("add it as a new task"));
        assert!(text.contains("mark an existing task as complete"));
        assert!(text.contains("or something else?"));
    }

    #[test]
    fn general_reply_routes_by_content() {
        assert_eq!(general_reply("hello there"), greeting());
        assert_eq!(general_reply("what can you do?"), capabilities());
        assert_eq!(general_reply("what's the weather like"), out_of_scope());
        assert_eq!(general_reply("hmm"), fallback());
    }

    #[test]
    fn tool_results_render_by_operation() {
        assert_eq!(
            tool_results(ToolName::AddTask, &json!({"description": "buy milk"})),
            task_created("buy milk")
        );
        assert_eq!(
            tool_results(
                ToolName::UpdateTask,
                &json!({"old_description": "a", "new_description": "b"})
            ),
            task_updated("a", "b")
        );
    }

    #[test]
    fn no_user_facing_text_leaks_tool_names() {
        for text in [
            tool_failure(),
            auth_required(),
            delete_confirmation("x"),
            fallback(),
        ] {
            for tool in ["add_task", "list_tasks", "update_task", "complete_task", "delete_task"] {
                assert!(!text.contains(tool));
            }
        }
    }
}
