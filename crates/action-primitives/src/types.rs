//! Core types for action primitives

use cdp_adapter::BrowsingContext;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ActionError;

/// Built-in list item selectors tried after the configured override, in order.
pub const DEFAULT_LIST_ITEM_SELECTORS: [&str; 4] = [
    ".lv-select-popup li",
    "[role=\"option\"]",
    "li[role=\"option\"]",
    "[data-value]",
];

/// Ordered, non-empty list of selectors for one logical target. First match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SelectorCandidates(Vec<String>);

impl SelectorCandidates {
    pub fn new<I, S>(selectors: I) -> Result<Self, ActionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selectors: Vec<String> = selectors.into_iter().map(Into::into).collect();
        if selectors.is_empty() {
            return Err(ActionError::InvalidCandidates(
                "at least one selector is required".to_string(),
            ));
        }
        if let Some(pos) = selectors.iter().position(|s| s.trim().is_empty()) {
            return Err(ActionError::InvalidCandidates(format!(
                "selector #{} is blank",
                pos + 1
            )));
        }
        Ok(Self(selectors))
    }

    pub fn single(selector: impl Into<String>) -> Result<Self, ActionError> {
        Self::new([selector.into()])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<String>> for SelectorCandidates {
    type Error = ActionError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SelectorCandidates> for Vec<String> {
    fn from(value: SelectorCandidates) -> Self {
        value.0
    }
}

/// A browsing context plus the candidate that matched in it.
///
/// Produced fresh by every resolution; never cached across polls or calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub context: BrowsingContext,
    pub selector: String,
}

/// Per-call overrides. Unset fields fall back to [`InteractionSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionOptions {
    /// Budget for resolution and, separately, for visibility.
    pub timeout: Option<Duration>,
    /// Additional attempts after the first.
    pub retries: Option<u32>,
    /// Keystroke delay for typing, press-to-release hold for clicks.
    pub delay: Option<Duration>,
}

impl ActionOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Session-wide interaction defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    pub selector_timeout_ms: u64,
    pub typing_delay_ms: u64,
    pub click_delay_ms: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub resolve_poll_ms: u64,
    pub visibility_poll_ms: u64,
    /// Tried before [`DEFAULT_LIST_ITEM_SELECTORS`] when set.
    pub dropdown_item_selector: Option<String>,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            selector_timeout_ms: 15_000,
            typing_delay_ms: 50,
            click_delay_ms: 50,
            retries: 2,
            retry_delay_ms: 400,
            resolve_poll_ms: 250,
            visibility_poll_ms: 100,
            dropdown_item_selector: None,
        }
    }
}

impl InteractionSettings {
    pub fn timeout(&self, options: &ActionOptions) -> Duration {
        options
            .timeout
            .unwrap_or(Duration::from_millis(self.selector_timeout_ms))
    }

    pub fn retries(&self, options: &ActionOptions) -> u32 {
        options.retries.unwrap_or(self.retries)
    }

    pub fn typing_delay(&self, options: &ActionOptions) -> Duration {
        options
            .delay
            .unwrap_or(Duration::from_millis(self.typing_delay_ms))
    }

    pub fn click_hold(&self, options: &ActionOptions) -> Duration {
        options
            .delay
            .unwrap_or(Duration::from_millis(self.click_delay_ms))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn resolve_poll(&self) -> Duration {
        Duration::from_millis(self.resolve_poll_ms)
    }

    pub fn visibility_poll(&self) -> Duration {
        Duration::from_millis(self.visibility_poll_ms)
    }

    /// Override (if any) followed by the built-in list item selectors.
    pub fn list_item_candidates(&self) -> Result<SelectorCandidates, ActionError> {
        let overrides = self
            .dropdown_item_selector
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        SelectorCandidates::new(
            overrides.chain(DEFAULT_LIST_ITEM_SELECTORS.iter().map(|s| s.to_string())),
        )
    }
}
