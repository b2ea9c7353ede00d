//! Tool-execution boundary.
//!
//! The engine never touches task storage directly; it issues [`ToolCall`]
//! values against a [`ToolExecutor`] and receives a uniform
//! [`ToolOutcome`]. Any boundary failure, including a timeout, is a
//! `success == false` outcome; the executor has no error path the engine
//! would treat differently.
//!
//! [`InMemoryTaskStore`] is the reference executor used by the test suite
//! and the demo binary. Persistent storage lives outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::types::{ToolCall, ToolName};

/// Result of one tool invocation at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub result: JsonValue,
    pub success: bool,
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(result: JsonValue) -> Self {
        Self {
            result,
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result: JsonValue::Null,
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Executes the five fixed task operations. Each call's parameters carry
/// the authenticated user id; implementations must scope every operation
/// to it.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> ToolOutcome;
}

#[derive(Debug, Clone)]
struct StoredTask {
    id: Uuid,
    description: String,
    completed: bool,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// In-memory task store keyed by user id, ordered by creation.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<String, Vec<StoredTask>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn param<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, String> {
        call.parameters
            .get(key)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| format!("missing parameter '{}'", key))
    }

    fn add_task(&self, call: &ToolCall) -> Result<JsonValue, String> {
        let user_id = Self::param(call, "user_id")?;
        let description = Self::param(call, "description")?.trim().to_string();
        if description.is_empty() {
            return Err("description must not be empty".to_string());
        }
        let task = StoredTask {
            id: Uuid::new_v4(),
            description,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        let payload = json!({
            "id": task.id.to_string(),
            "description": task.description,
            "completed": false,
            "created_at": task.created_at.to_rfc3339(),
        });
        self.tasks.entry(user_id.to_string()).or_default().push(task);
        Ok(payload)
    }

    fn list_tasks(&self, call: &ToolCall) -> Result<JsonValue, String> {
        let user_id = Self::param(call, "user_id")?;
        let tasks = self
            .tasks
            .get(user_id)
            .map(|entry| {
                entry
                    .iter()
                    .map(|t| {
                        json!({
                            "id": t.id.to_string(),
                            "description": t.description,
                            "completed": t.completed,
                            "created_at": t.created_at.to_rfc3339(),
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(json!({ "tasks": tasks }))
    }

    fn complete_task(&self, call: &ToolCall) -> Result<JsonValue, String> {
        let user_id = Self::param(call, "user_id")?;
        let task_id = Self::param(call, "task_id")?;
        let mut entry = self
            .tasks
            .get_mut(user_id)
            .ok_or_else(|| format!("task not found: {}", task_id))?;
        let task = entry
            .iter_mut()
            .find(|t| t.id.to_string() == task_id)
            .ok_or_else(|| format!("task not found: {}", task_id))?;
        task.completed = true;
        task.completed_at = Some(Utc::now());
        Ok(json!({
            "id": task.id.to_string(),
            "description": task.description,
            "completed": true,
            "completed_at": task.completed_at.map(|t| t.to_rfc3339()),
        }))
    }

    fn update_task(&self, call: &ToolCall) -> Result<JsonValue, String> {
        let user_id = Self::param(call, "user_id")?;
        let task_id = Self::param(call, "task_id")?;
        let description = Self::param(call, "description")?.trim().to_string();
        if description.is_empty() {
            return Err("description must not be empty".to_string());
        }
        let mut entry = self
            .tasks
            .get_mut(user_id)
            .ok_or_else(|| format!("task not found: {}", task_id))?;
        let task = entry
            .iter_mut()
            .find(|t| t.id.to_string() == task_id)
            .ok_or_else(|| format!("task not found: {}", task_id))?;
        let old_description = std::mem::replace(&mut task.description, description);
        Ok(json!({
            "id": task.id.to_string(),
            "old_description": old_description,
            "new_description": task.description,
            "description": task.description,
            "completed": task.completed,
        }))
    }

    fn delete_task(&self, call: &ToolCall) -> Result<JsonValue, String> {
        let user_id = Self::param(call, "user_id")?;
        let task_id = Self::param(call, "task_id")?;
        let mut entry = self
            .tasks
            .get_mut(user_id)
            .ok_or_else(|| format!("task not found: {}", task_id))?;
        let position = entry
            .iter()
            .position(|t| t.id.to_string() == task_id)
            .ok_or_else(|| format!("task not found: {}", task_id))?;
        let removed = entry.remove(position);
        Ok(json!({
            "id": removed.id.to_string(),
            "description": removed.description,
            "deleted": true,
        }))
    }
}

#[async_trait]
impl ToolExecutor for InMemoryTaskStore {
    async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        let outcome = match call.name {
            ToolName::AddTask => self.add_task(call),
            ToolName::ListTasks => self.list_tasks(call),
            ToolName::CompleteTask => self.complete_task(call),
            ToolName::UpdateTask => self.update_task(call),
            ToolName::DeleteTask => self.delete_task(call),
        };
        match outcome {
            Ok(result) => {
                debug!(tool = %call.name, "tool call succeeded");
                ToolOutcome::ok(result)
            }
            Err(message) => {
                debug!(tool = %call.name, error = %message, "tool call failed");
                ToolOutcome::failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: ToolName) -> ToolCall {
        ToolCall::new(name, "u-1", 1)
    }

    #[tokio::test]
    async fn add_then_list_preserves_order() {
        let store = InMemoryTaskStore::new();
        for description in ["buy groceries", "call mom"] {
            let outcome = store
                .execute(&call(ToolName::AddTask).with_param("description", description))
                .await;
            assert!(outcome.success);
        }
        let outcome = store.execute(&call(ToolName::ListTasks)).await;
        let tasks = outcome.result["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0]["description"], "buy groceries");
        assert_eq!(tasks[1]["description"], "call mom");
    }

    #[tokio::test]
    async fn operations_are_scoped_per_user() {
        let store = InMemoryTaskStore::new();
        store
            .execute(&call(ToolName::AddTask).with_param("description", "mine"))
            .await;
        let other = ToolCall::new(ToolName::ListTasks, "u-2", 1);
        let outcome = store.execute(&other).await;
        assert!(outcome.result["tasks"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_and_delete_round_trip() {
        let store = InMemoryTaskStore::new();
        let added = store
            .execute(&call(ToolName::AddTask).with_param("description", "buy groceries"))
            .await;
        let id = added.result["id"].as_str().unwrap().to_string();

        let completed = store
            .execute(&call(ToolName::CompleteTask).with_param("task_id", id.clone()))
            .await;
        assert!(completed.success);
        assert_eq!(completed.result["completed"], true);

        let deleted = store
            .execute(&call(ToolName::DeleteTask).with_param("task_id", id.clone()))
            .await;
        assert!(deleted.success);

        let again = store
            .execute(&call(ToolName::DeleteTask).with_param("task_id", id))
            .await;
        assert!(!again.success);
        assert!(again.error.is_some());
    }

    #[tokio::test]
    async fn unknown_task_is_a_failed_outcome_not_a_panic() {
        let store = InMemoryTaskStore::new();
        let outcome = store
            .execute(&call(ToolName::UpdateTask).with_param("task_id", "nope").with_param("description", "x"))
            .await;
        assert!(!outcome.success);
    }
}
