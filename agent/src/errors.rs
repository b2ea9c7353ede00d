//! Error taxonomy for the agent decision engine.
//!
//! Every variant here is resolved *inside* the engine into a valid
//! `AgentDecision`; the public `process` entry point has no error path.
//! The enum exists so internal seams (classifier validation, pending
//! store, tool boundary) can report precisely what went wrong before the
//! orchestrator folds the failure into user-facing behavior.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The external classifier returned a tag outside the closed intent
    /// set or a payload that failed shape validation. Folded into an
    /// `Ambiguous` classification, never surfaced raw.
    #[error("invalid classification: {0}")]
    ClassificationInvalid(String),

    /// A task reference matched nothing. Surfaced as a clarification.
    #[error("no task matches reference '{0}'")]
    ReferenceNotFound(String),

    /// A task reference matched more than one task. Surfaced as a
    /// clarification listing the candidates.
    #[error("reference '{reference}' matches {count} tasks")]
    ReferenceAmbiguous { reference: String, count: usize },

    /// A tool-boundary call reported failure (including timeouts, which
    /// the boundary maps to failure uniformly). Surfaced as a friendly
    /// error; never retried.
    #[error("tool {tool} failed: {message}")]
    ToolExecutionFailed { tool: String, message: String },

    /// No authenticated user in the context. Fatal for the invocation;
    /// fixed response, no tool calls.
    #[error("authenticated user identifier is missing from context")]
    MissingUserContext,

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The pending confirmation store could not be read or written. The
    /// engine degrades to treating the conversation as having no pending
    /// action.
    #[error("pending store error: {0}")]
    PendingStore(String),
}
