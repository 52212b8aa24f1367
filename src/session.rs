//! Browser session factory and navigation wrapper.

use std::sync::Arc;
use std::time::Duration;

use action_primitives::{CdpPage, DefaultActionPrimitives};
use cdp_adapter::{AdapterError, CdpAdapter, NavigationWait, PageId};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::errors::{navigation_class, SessionError};

/// One launched (or attached) browser with a single working page.
pub struct BrowserSession {
    adapter: Arc<CdpAdapter>,
    page: PageId,
    config: AppConfig,
}

/// Start the browser, open a blank page and apply user agent and viewport overrides.
pub async fn launch_session(config: &AppConfig) -> Result<(BrowserSession, PageId), SessionError> {
    config.validate()?;
    let adapter = Arc::new(CdpAdapter::new(config.cdp_config()));
    open_session(adapter, config).await
}

/// Start `adapter` and prepare its working page. Any failure shuts the adapter down
/// before returning.
pub async fn open_session(
    adapter: Arc<CdpAdapter>,
    config: &AppConfig,
) -> Result<(BrowserSession, PageId), SessionError> {
    let prepared = match Arc::clone(&adapter).start().await {
        Ok(()) => prepare_page(&adapter, config).await,
        Err(err) => Err(err),
    };
    let page = match prepared {
        Ok(page) => page,
        Err(err) => {
            warn!(error = %err, "browser session setup failed; shutting down");
            adapter.shutdown().await;
            return Err(err.into());
        }
    };

    info!(
        %page,
        headless = config.browser.headless,
        attached = config.browser.ws_url.is_some(),
        "browser session ready"
    );

    let session = BrowserSession {
        adapter,
        page,
        config: config.clone(),
    };
    Ok((session, page))
}

async fn prepare_page(adapter: &CdpAdapter, config: &AppConfig) -> Result<PageId, AdapterError> {
    let page = adapter.create_page("about:blank").await?;
    if let Some(user_agent) = &config.browser.user_agent {
        adapter.set_user_agent(page, user_agent).await?;
    }
    adapter.set_viewport(page, config.browser.viewport).await?;
    Ok(page)
}

impl BrowserSession {
    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn adapter(&self) -> &Arc<CdpAdapter> {
        &self.adapter
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn page_port(&self) -> CdpPage {
        CdpPage::new(Arc::clone(&self.adapter), self.page)
    }

    /// Interaction core bound to this session's page and settings.
    pub fn primitives(&self) -> DefaultActionPrimitives {
        DefaultActionPrimitives::with_settings(
            Arc::new(self.page_port()),
            self.config.interaction_settings(),
        )
    }

    /// Navigate with the configured navigation timeout.
    pub async fn goto(
        &self,
        url: &str,
        wait: NavigationWait,
        context_message: &str,
    ) -> Result<(), AdapterError> {
        let timeout = Duration::from_millis(self.config.timeouts.navigation_ms);
        goto(&self.adapter, self.page, url, wait, timeout, context_message).await
    }

    /// Shut the adapter down; a launched browser process is terminated with it.
    pub async fn close(self) {
        self.adapter.shutdown().await;
        info!(page = %self.page, "browser session closed");
    }
}

/// Navigate `page` to `url`. On failure the error is logged under `context_message`
/// and returned unchanged.
pub async fn goto(
    adapter: &CdpAdapter,
    page: PageId,
    url: &str,
    wait: NavigationWait,
    timeout: Duration,
    context_message: &str,
) -> Result<(), AdapterError> {
    match adapter.navigate(page, url, wait, timeout).await {
        Ok(()) => {
            info!(%page, url, ?wait, "navigated");
            Ok(())
        }
        Err(err) => {
            match navigation_class(&err) {
                Some(class) => error!(%page, url, class, error = %err, "{context_message}"),
                None => warn!(%page, url, error = %err, "{context_message}"),
            }
            Err(err)
        }
    }
}
