//! Action executor
//!
//! Three element actions built on resolution, the visibility gate and best-effort scrolling:
//! 1. click_element - resolve, gate, scroll, click; retried
//! 2. type_into_field - resolve, gate, scroll, focus, clear, type; retried
//! 3. select_dropdown_item - resolve the open list, match by text, click; single attempt

mod click;
mod scroll;
mod select;
mod type_text;

pub use click::*;
pub use scroll::*;
pub use select::*;
pub use type_text::*;

use async_trait::async_trait;
use cdp_adapter::BrowsingContext;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    errors::ActionError,
    locator::resolve_target,
    ports::PagePort,
    types::{ActionOptions, InteractionSettings, ResolvedTarget, SelectorCandidates},
    waiting::await_visible,
};

/// Action primitives trait
#[async_trait]
pub trait ActionPrimitives: Send + Sync {
    /// Click the first candidate that resolves, with retries.
    async fn click_element(
        &self,
        candidates: &SelectorCandidates,
        options: ActionOptions,
    ) -> Result<(), ActionError>;

    /// Replace the contents of a field with `text`, with retries.
    async fn type_into_field(
        &self,
        candidates: &SelectorCandidates,
        text: &str,
        options: ActionOptions,
    ) -> Result<(), ActionError>;

    /// Click the item of an open list whose text best matches `text`.
    async fn select_dropdown_item(
        &self,
        text: &str,
        options: ActionOptions,
    ) -> Result<(), ActionError>;
}

/// Default implementation of action primitives
#[derive(Clone)]
pub struct DefaultActionPrimitives {
    port: Arc<dyn PagePort>,
    settings: InteractionSettings,
}

impl DefaultActionPrimitives {
    pub fn new(port: Arc<dyn PagePort>) -> Self {
        Self::with_settings(port, InteractionSettings::default())
    }

    pub fn with_settings(port: Arc<dyn PagePort>, settings: InteractionSettings) -> Self {
        Self { port, settings }
    }

    pub fn port(&self) -> &Arc<dyn PagePort> {
        &self.port
    }

    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    /// Find the browsing context holding a match for `candidates`.
    pub async fn resolve(
        &self,
        candidates: &SelectorCandidates,
        timeout: Duration,
    ) -> Result<ResolvedTarget, ActionError> {
        resolve_target(
            self.port.as_ref(),
            candidates,
            timeout,
            self.settings.resolve_poll(),
        )
        .await
    }

    /// Wait until `selector` is interactable inside `ctx`.
    pub async fn await_visible(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ActionError> {
        await_visible(
            self.port.as_ref(),
            ctx,
            selector,
            timeout,
            self.settings.visibility_poll(),
        )
        .await
    }

    /// Best-effort scroll; never fails.
    pub async fn ensure_in_view(&self, ctx: &BrowsingContext, selector: &str) {
        scroll::ensure_in_view(self.port.as_ref(), ctx, selector).await
    }

    /// Resolve, gate and scroll. The common prefix of every element action.
    pub(crate) async fn prepare(
        &self,
        candidates: &SelectorCandidates,
        timeout: Duration,
    ) -> Result<ResolvedTarget, ActionError> {
        let target = self.resolve(candidates, timeout).await?;
        self.await_visible(&target.context, &target.selector, timeout)
            .await?;
        self.ensure_in_view(&target.context, &target.selector).await;
        Ok(target)
    }
}

#[async_trait]
impl ActionPrimitives for DefaultActionPrimitives {
    async fn click_element(
        &self,
        candidates: &SelectorCandidates,
        options: ActionOptions,
    ) -> Result<(), ActionError> {
        click::execute_click(self, candidates, options).await
    }

    async fn type_into_field(
        &self,
        candidates: &SelectorCandidates,
        text: &str,
        options: ActionOptions,
    ) -> Result<(), ActionError> {
        type_text::execute_type_text(self, candidates, text, options).await
    }

    async fn select_dropdown_item(
        &self,
        text: &str,
        options: ActionOptions,
    ) -> Result<(), ActionError> {
        select::execute_select(self, text, options).await
    }
}

pub(crate) fn new_action_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
