//! Error types for action primitives

use cdp_adapter::AdapterError;
use thiserror::Error;

/// Failure of a resolution, visibility wait or action.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Candidate list was empty or contained a blank selector
    #[error("Invalid selector candidates: {0}")]
    InvalidCandidates(String),

    /// No candidate matched in the main document or any frame before the deadline
    #[error("No element matched {candidates:?} in any browsing context within {timeout_ms}ms")]
    ResolutionTimeout {
        candidates: Vec<String>,
        timeout_ms: u64,
    },

    /// Element was found but never became interactable
    #[error("Element '{selector}' not interactable within {timeout_ms}ms: {reason}")]
    VisibilityTimeout {
        selector: String,
        timeout_ms: u64,
        reason: String,
    },

    /// The browser rejected or failed the low-level primitive
    #[error("Action on '{selector}' failed: {source}")]
    ActionFailed {
        selector: String,
        #[source]
        source: AdapterError,
    },

    /// No list item matched; carries the text exactly as requested
    #[error("Item not found in list: {0}")]
    ItemNotFound(String),
}

impl ActionError {
    pub fn action_failed(selector: impl Into<String>, source: AdapterError) -> Self {
        ActionError::ActionFailed {
            selector: selector.into(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ActionError::ResolutionTimeout { .. } | ActionError::VisibilityTimeout { .. }
        )
    }

    /// Stable short name for logs and CLI exit summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::InvalidCandidates(_) => "invalid-candidates",
            ActionError::ResolutionTimeout { .. } => "resolution-timeout",
            ActionError::VisibilityTimeout { .. } => "visibility-timeout",
            ActionError::ActionFailed { .. } => "action-failed",
            ActionError::ItemNotFound(_) => "item-not-found",
        }
    }
}
