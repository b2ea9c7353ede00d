//! Intent classification.
//!
//! The engine treats language understanding as a pluggable black box
//! behind [`IntentClassifier`]. Implementations must be deterministic for
//! a fixed `(message, history)` pair (external models are invoked with
//! zero-temperature decoding) because the whole pipeline's
//! reproducibility contract rests on it.
//!
//! Raw results from an external model arrive as [`RawClassification`] and
//! are schema-validated here. A tag outside the closed intent set or a
//! payload with the wrong shape folds into an `Ambiguous` classification;
//! callers never see a classification error.

pub mod patterns;

pub use patterns::PatternClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::errors::AgentError;
use crate::types::{ClassifiedIntent, Intent, IntentTag, Message};

/// Maps one user message plus recent history to a classified intent.
///
/// Infallible by contract: validation failures inside an implementation
/// must fold to `Ambiguous`, not propagate.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str, history: &[Message]) -> ClassifiedIntent;
}

/// Unvalidated classification as produced by an external model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClassification {
    pub intent_type: String,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub params: JsonValue,
}

/// A source of raw classifications: the actual language-understanding
/// boundary. Unlike [`IntentClassifier`] this may fail; the validating
/// wrapper owns turning failures into safe classifications.
#[async_trait]
pub trait RawIntentSource: Send + Sync {
    async fn infer(
        &self,
        message: &str,
        history: &[Message],
    ) -> Result<RawClassification, AgentError>;
}

/// Wraps a [`RawIntentSource`] and owns result validation.
pub struct SchemaValidatedClassifier<S> {
    source: S,
}

impl<S: RawIntentSource> SchemaValidatedClassifier<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: RawIntentSource> IntentClassifier for SchemaValidatedClassifier<S> {
    async fn classify(&self, message: &str, history: &[Message]) -> ClassifiedIntent {
        match self.source.infer(message, history).await {
            Ok(raw) => match validate_raw(&raw) {
                Ok(classified) => classified,
                Err(e) => {
                    warn!(error = %e, "classifier returned invalid result, folding to ambiguous");
                    fallback_ambiguous()
                }
            },
            Err(e) => {
                warn!(error = %e, "classifier call failed, folding to ambiguous");
                fallback_ambiguous()
            }
        }
    }
}

/// Validate a raw classification against the closed intent set and the
/// per-variant payload shape.
pub fn validate_raw(raw: &RawClassification) -> Result<ClassifiedIntent, AgentError> {
    let tag = IntentTag::parse(&raw.intent_type).ok_or_else(|| {
        AgentError::ClassificationInvalid(format!("unknown intent tag '{}'", raw.intent_type))
    })?;

    if let Some(confidence) = raw.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(AgentError::ClassificationInvalid(format!(
                "confidence {} outside [0.0, 1.0]",
                confidence
            )));
        }
    }

    let intent = match tag {
        IntentTag::CreateTask => Intent::CreateTask {
            description: required_str(&raw.params, "description")?,
        },
        IntentTag::ListTasks => Intent::ListTasks,
        IntentTag::CompleteTask => Intent::CompleteTask {
            reference: required_str(&raw.params, "task_reference")?,
        },
        IntentTag::UpdateTask => Intent::UpdateTask {
            reference: required_str(&raw.params, "task_reference")?,
            new_description: required_str(&raw.params, "new_description")?,
        },
        IntentTag::DeleteTask => Intent::DeleteTask {
            reference: required_str(&raw.params, "task_reference")?,
        },
        IntentTag::GeneralChat => Intent::GeneralChat,
        IntentTag::Ambiguous => {
            let candidates = raw
                .params
                .get("possible_intents")
                .and_then(JsonValue::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(JsonValue::as_str)
                        .filter_map(IntentTag::parse)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            if candidates.is_empty() {
                return Err(AgentError::ClassificationInvalid(
                    "AMBIGUOUS classification must carry at least one candidate intent".to_string(),
                ));
            }
            Intent::Ambiguous { candidates }
        }
        IntentTag::ConfirmYes => Intent::ConfirmYes,
        IntentTag::ConfirmNo => Intent::ConfirmNo,
    };

    Ok(ClassifiedIntent {
        intent,
        confidence: raw.confidence,
    })
}

fn required_str(params: &JsonValue, key: &str) -> Result<String, AgentError> {
    params
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AgentError::ClassificationInvalid(format!("missing or empty parameter '{}'", key))
        })
}

/// The safe classification used whenever validation fails: the message
/// could plausibly be a new task or a reference to an existing one, so
/// the policy will ask rather than act.
fn fallback_ambiguous() -> ClassifiedIntent {
    ClassifiedIntent {
        intent: Intent::Ambiguous {
            candidates: vec![IntentTag::CreateTask, IntentTag::CompleteTask],
        },
        confidence: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CannedSource(RawClassification);

    #[async_trait]
    impl RawIntentSource for CannedSource {
        async fn infer(
            &self,
            _message: &str,
            _history: &[Message],
        ) -> Result<RawClassification, AgentError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn valid_create_task_passes() {
        let raw = RawClassification {
            intent_type: "CREATE_TASK".to_string(),
            confidence: Some(0.92),
            params: json!({"description": "buy groceries"}),
        };
        let classified = validate_raw(&raw).unwrap();
        assert_eq!(
            classified.intent,
            Intent::CreateTask {
                description: "buy groceries".to_string()
            }
        );
    }

    #[test]
    fn unknown_tag_is_invalid() {
        let raw = RawClassification {
            intent_type: "FORMAT_DISK".to_string(),
            confidence: None,
            params: JsonValue::Null,
        };
        assert!(validate_raw(&raw).is_err());
    }

    #[test]
    fn ambiguous_without_candidates_is_invalid() {
        let raw = RawClassification {
            intent_type: "AMBIGUOUS".to_string(),
            confidence: Some(0.4),
            params: json!({"possible_intents": []}),
        };
        assert!(validate_raw(&raw).is_err());
    }

    #[test]
    fn out_of_range_confidence_is_invalid() {
        let raw = RawClassification {
            intent_type: "LIST_TASKS".to_string(),
            confidence: Some(1.7),
            params: JsonValue::Null,
        };
        assert!(validate_raw(&raw).is_err());
    }

    #[tokio::test]
    async fn invalid_result_folds_to_ambiguous() {
        let classifier = SchemaValidatedClassifier::new(CannedSource(RawClassification {
            intent_type: "DELETE_TASK".to_string(),
            confidence: Some(0.9),
            // Missing task_reference payload.
            params: JsonValue::Null,
        }));
        let classified = classifier.classify("delete it", &[]).await;
        match classified.intent {
            Intent::Ambiguous { candidates } => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguous fold, got {:?}", other),
        }
    }
}
