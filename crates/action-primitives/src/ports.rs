use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{
    AdapterError, BrowsingContext, CdpAdapter, ElementLayout, ListItemSnapshot, PageId,
};

/// Page capabilities the interaction layer is built on.
///
/// Everything is scoped to one page. Keyboard input goes to whatever currently has focus.
#[async_trait]
pub trait PagePort: Send + Sync {
    fn main_context(&self) -> BrowsingContext;
    /// Current nested documents; the set may differ between calls.
    async fn frame_contexts(&self) -> Result<Vec<BrowsingContext>, AdapterError>;
    async fn count_matches(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<usize, AdapterError>;
    async fn wait_for_selector_visible(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), AdapterError>;
    async fn layout(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<ElementLayout, AdapterError>;
    async fn scroll_into_view(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<bool, AdapterError>;
    async fn click(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        index: usize,
        hold: Duration,
        click_count: u32,
    ) -> Result<(), AdapterError>;
    async fn press_key(&self, key: &str) -> Result<(), AdapterError>;
    async fn type_text(&self, text: &str, delay: Duration) -> Result<(), AdapterError>;
    async fn list_items(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<Vec<ListItemSnapshot>, AdapterError>;
}

/// [`PagePort`] over one page of a live [`CdpAdapter`].
#[derive(Clone)]
pub struct CdpPage {
    adapter: Arc<CdpAdapter>,
    page: PageId,
}

impl CdpPage {
    pub fn new(adapter: Arc<CdpAdapter>, page: PageId) -> Self {
        Self { adapter, page }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn adapter(&self) -> &Arc<CdpAdapter> {
        &self.adapter
    }
}

#[async_trait]
impl PagePort for CdpPage {
    fn main_context(&self) -> BrowsingContext {
        self.adapter.main_context(self.page)
    }

    async fn frame_contexts(&self) -> Result<Vec<BrowsingContext>, AdapterError> {
        self.adapter.frame_contexts(self.page).await
    }

    async fn count_matches(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<usize, AdapterError> {
        self.adapter.count_matches(ctx, selector).await
    }

    async fn wait_for_selector_visible(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), AdapterError> {
        self.adapter
            .wait_for_selector_visible(ctx, selector, timeout)
            .await
    }

    async fn layout(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<ElementLayout, AdapterError> {
        self.adapter.layout(ctx, selector).await
    }

    async fn scroll_into_view(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<bool, AdapterError> {
        self.adapter.scroll_into_view(ctx, selector).await
    }

    async fn click(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        index: usize,
        hold: Duration,
        click_count: u32,
    ) -> Result<(), AdapterError> {
        self.adapter
            .click(ctx, selector, index, hold, click_count)
            .await
    }

    async fn press_key(&self, key: &str) -> Result<(), AdapterError> {
        self.adapter.press_key(self.page, key).await
    }

    async fn type_text(&self, text: &str, delay: Duration) -> Result<(), AdapterError> {
        self.adapter.type_text(self.page, text, delay).await
    }

    async fn list_items(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<Vec<ListItemSnapshot>, AdapterError> {
        self.adapter.list_items(ctx, selector).await
    }
}
