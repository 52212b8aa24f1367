use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, sleep, Instant};
use tokio::{select, spawn};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::commands::{ElementLayout, ElementPoint, ListItemSnapshot, NavigationWait, Viewport};
use crate::config::CdpConfig;
use crate::context::{BrowsingContext, FrameHandle};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::ids::{PageId, SessionId};
use crate::input;
use crate::registry::{FrameTarget, Registry};
use crate::transport::{CdpTransport, ChromiumTransport, CommandTarget, TransportEvent};

const ISOLATED_WORLD: &str = "__frameweave";
const READY_POLL: Duration = Duration::from_millis(100);
const VISIBLE_POLL: Duration = Duration::from_millis(100);

/// Adapter implementation with pluggable transport.
pub struct CdpAdapter {
    pub cfg: CdpConfig,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    transport: Arc<dyn CdpTransport>,
    /// target id -> page
    targets: DashMap<String, PageId>,
    /// page-level cdp session -> page
    sessions: DashMap<String, PageId>,
    /// out-of-process frame session -> owning page
    frame_sessions: DashMap<String, PageId>,
}

impl CdpAdapter {
    pub fn new(cfg: CdpConfig) -> Self {
        let transport: Arc<dyn CdpTransport> = Arc::new(ChromiumTransport::new(cfg.clone()));
        Self::with_transport(cfg, transport)
    }

    pub fn with_transport(cfg: CdpConfig, transport: Arc<dyn CdpTransport>) -> Self {
        Self {
            cfg,
            registry: Arc::new(Registry::new()),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            transport,
            targets: DashMap::new(),
            sessions: DashMap::new(),
            frame_sessions: DashMap::new(),
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Connect the transport and spawn the event loop. Calling it twice is a no-op.
    pub async fn start(self: Arc<Self>) -> Result<(), AdapterError> {
        {
            let guard = self.tasks.lock().await;
            if !guard.is_empty() {
                return Ok(());
            }
        }

        self.transport.start().await?;
        let loop_task = spawn(Self::event_loop(Arc::clone(&self)));
        self.tasks.lock().await.push(loop_task);
        info!(target: "cdp-adapter", "event loop started");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let mut handles = self.tasks.lock().await;
        while let Some(handle) = handles.pop() {
            let _ = handle.await;
        }
        self.transport.close().await;
        self.registry.clear();
        info!(target: "cdp-adapter", "adapter shut down");
    }

    pub fn register_page(
        &self,
        page: PageId,
        session: SessionId,
        target_id: Option<String>,
        cdp_session: Option<String>,
    ) {
        if let Some(target) = target_id.clone() {
            self.targets.insert(target, page);
        }
        if let Some(cdp) = cdp_session.clone() {
            self.sessions.insert(cdp, page);
        }
        self.registry
            .insert_page(page, session, target_id, cdp_session);
    }

    /// Open a new tab and wait until its session is attached.
    pub async fn create_page(&self, url: &str) -> Result<PageId, AdapterError> {
        let response = self
            .send_command("Target.createTarget", json!({ "url": url }))
            .await?;
        let target_id = response
            .get("targetId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("createTarget missing targetId")
            })?
            .to_string();

        let deadline = Instant::now() + Duration::from_secs(5);
        let page = loop {
            if let Some(entry) = self.targets.get(&target_id) {
                let page = *entry.value();
                if self.registry.get_cdp_session(&page).is_some() {
                    break page;
                }
            }

            if Instant::now() >= deadline {
                return Err(AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("timed out waiting for target attach"));
            }

            sleep(Duration::from_millis(50)).await;
        };

        // Out-of-process iframes only attach once the page session asks for them.
        if let Err(err) = self
            .send_page_command(page, "Target.setAutoAttach", auto_attach_params())
            .await
        {
            warn!(target: "cdp-adapter", %page, ?err, "frame auto-attach unavailable");
        }

        info!(target: "cdp-adapter", %page, target_id = %target_id, "page created");
        Ok(page)
    }

    /// Navigate and wait for the requested readiness, bounded by `timeout`.
    pub async fn navigate(
        &self,
        page: PageId,
        url: &str,
        wait: NavigationWait,
        timeout: Duration,
    ) -> Result<(), AdapterError> {
        let parsed = Url::parse(url).map_err(|err| {
            AdapterError::new(AdapterErrorKind::InvalidUrl).with_hint(format!("{url}: {err}"))
        })?;

        let deadline = Instant::now() + timeout;
        let response = self
            .send_page_command(page, "Page.navigate", json!({ "url": parsed.as_str() }))
            .await?;

        if let Some(error_text) = response
            .get("errorText")
            .and_then(|v| v.as_str())
            .filter(|text| !text.is_empty())
        {
            return Err(AdapterError::new(AdapterErrorKind::NavFailed)
                .with_hint(format!("{url}: {error_text}"))
                .with_data(json!({ "url": url, "errorText": error_text })));
        }

        self.registry.set_recent_url(&page, parsed.to_string());
        self.wait_for_ready_state(page, wait, deadline).await?;
        debug!(target: "cdp-adapter", %page, url = %parsed, ?wait, "navigation settled");
        Ok(())
    }

    async fn wait_for_ready_state(
        &self,
        page: PageId,
        wait: NavigationWait,
        deadline: Instant,
    ) -> Result<(), AdapterError> {
        loop {
            // Evaluation fails while the old document is being torn down.
            let state = match self
                .evaluate(&BrowsingContext::main(page), "document.readyState")
                .await
            {
                Ok(value) => value.as_str().map(str::to_string),
                Err(err) => {
                    debug!(target: "cdp-adapter", %page, ?err, "readyState probe failed");
                    None
                }
            };

            if state.as_deref().map(|s| wait.is_satisfied_by(s)).unwrap_or(false) {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint(format!(
                        "document did not reach {wait:?} (last readyState: {})",
                        state.as_deref().unwrap_or("unknown")
                    ))
                    .retriable(true));
            }

            sleep(READY_POLL).await;
        }
    }

    pub fn main_context(&self, page: PageId) -> BrowsingContext {
        BrowsingContext::main(page)
    }

    /// Enumerate every nested document of `page`, depth-first in frame-tree order.
    ///
    /// Same-process frames get a fresh isolated world each call. Out-of-process frames use
    /// their attached session; any attached frame target missing from the tree is appended.
    pub async fn frame_contexts(&self, page: PageId) -> Result<Vec<BrowsingContext>, AdapterError> {
        let tree = self
            .send_page_command(page, "Page.getFrameTree", json!({}))
            .await?;
        let root = tree.get("frameTree").ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::Internal).with_hint("getFrameTree missing frameTree")
        })?;

        let mut frames = Vec::new();
        collect_child_frames(root, &mut frames);

        let attached = self.registry.frame_targets(&page);
        let mut seen = HashSet::new();
        let mut contexts = Vec::with_capacity(frames.len());

        for (frame_id, url) in frames {
            if let Some(target) = attached.iter().find(|t| t.target_id == frame_id) {
                seen.insert(target.target_id.clone());
                contexts.push(oopif_context(page, target));
                continue;
            }

            match self.isolated_world(page, &frame_id).await {
                Ok(context_id) => contexts.push(BrowsingContext::frame(
                    page,
                    FrameHandle {
                        frame_id,
                        url,
                        session: None,
                        execution_context_id: Some(context_id),
                    },
                )),
                Err(err) => {
                    debug!(target: "cdp-adapter", %page, frame = %frame_id, ?err, "skipping frame without context");
                }
            }
        }

        for target in attached.iter().filter(|t| !seen.contains(&t.target_id)) {
            contexts.push(oopif_context(page, target));
        }

        Ok(contexts)
    }

    async fn isolated_world(&self, page: PageId, frame_id: &str) -> Result<i64, AdapterError> {
        let response = self
            .send_page_command(
                page,
                "Page.createIsolatedWorld",
                json!({
                    "frameId": frame_id,
                    "worldName": ISOLATED_WORLD,
                    "grantUniveralAccess": true,
                }),
            )
            .await?;
        response
            .get("executionContextId")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("createIsolatedWorld missing executionContextId")
            })
    }

    /// Evaluate `expression` in `ctx` and return its JSON value.
    pub async fn evaluate(
        &self,
        ctx: &BrowsingContext,
        expression: &str,
    ) -> Result<Value, AdapterError> {
        let page_session = self.page_session(ctx.page)?;
        let mut params = json!({
            "expression": expression,
            "awaitPromise": true,
            "returnByValue": true,
            "userGesture": true,
        });
        if let Some(context_id) = ctx.execution_context_id() {
            params["contextId"] = json!(context_id);
        }

        let response = self
            .transport
            .send_command(ctx.command_target(&page_session), "Runtime.evaluate", params)
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            let description = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .or_else(|| details.get("text").and_then(|t| t.as_str()))
                .unwrap_or("script exception");
            return Err(AdapterError::new(AdapterErrorKind::ScriptException)
                .with_hint(description.to_string())
                .with_data(details.clone()));
        }

        Ok(response
            .get("result")
            .and_then(|res| res.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Number of elements matching `selector`; invalid selectors surface as script exceptions.
    pub async fn count_matches(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<usize, AdapterError> {
        let expression = format!(
            "document.querySelectorAll({}).length",
            selector_literal(selector)?
        );
        let value = self.evaluate(ctx, &expression).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    /// Poll until the first match exists, is not `visibility: hidden`, and has some box.
    pub async fn wait_for_selector_visible(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), AdapterError> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             const style = window.getComputedStyle(el); const r = el.getBoundingClientRect(); \
             return !!style && style.visibility !== 'hidden' && !!(r.top || r.bottom || r.width || r.height); }})()",
            sel = selector_literal(selector)?
        );
        let deadline = Instant::now() + timeout;
        let mut last_error: Option<AdapterError> = None;

        loop {
            let budget = deadline.saturating_duration_since(Instant::now());
            match time::timeout(budget, self.evaluate(ctx, &expression)).await {
                Ok(Ok(Value::Bool(true))) => return Ok(()),
                Ok(Ok(_)) | Err(_) => {}
                Ok(Err(err)) => last_error = Some(err),
            }

            if Instant::now() >= deadline {
                let mut hint = format!(
                    "'{selector}' not visible in {} within {}ms",
                    ctx.label(),
                    timeout.as_millis()
                );
                if let Some(err) = last_error {
                    hint.push_str(&format!(" (last probe error: {err})"));
                }
                return Err(AdapterError::new(AdapterErrorKind::WaitTimeout).with_hint(hint));
            }

            sleep(VISIBLE_POLL).await;
        }
    }

    pub async fn layout(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<ElementLayout, AdapterError> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return {{ exists: false }}; \
             const r = el.getBoundingClientRect(); const s = window.getComputedStyle(el); \
             return {{ exists: true, width: r.width, height: r.height, display: s.display, \
             visibility: s.visibility, opacity: s.opacity }}; }})()",
            sel = selector_literal(selector)?
        );
        let value = self.evaluate(ctx, &expression).await?;
        serde_json::from_value(value).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("malformed layout probe: {err}"))
        })
    }

    /// Scroll the first match to the viewport center. Returns whether it existed.
    ///
    /// For frame contexts the owning `<iframe>` is brought into view in the parent first.
    pub async fn scroll_into_view(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<bool, AdapterError> {
        if let Some(frame) = &ctx.frame {
            match self.frame_owner(ctx.page, &frame.frame_id).await {
                Ok(node) => {
                    self.send_page_command(
                        ctx.page,
                        "DOM.scrollIntoViewIfNeeded",
                        json!({ "backendNodeId": node }),
                    )
                    .await?;
                }
                Err(err) => {
                    debug!(target: "cdp-adapter", frame = %frame.frame_id, ?err, "frame owner not scrollable");
                }
            }
        }

        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             el.scrollIntoView({{ block: 'center', inline: 'center', behavior: 'instant' }}); return true; }})()",
            sel = selector_literal(selector)?
        );
        let value = self.evaluate(ctx, &expression).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Center of the `index`-th match in top-level viewport coordinates.
    pub async fn element_center(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        index: usize,
    ) -> Result<ElementPoint, AdapterError> {
        let expression = format!(
            "(() => {{ const el = document.querySelectorAll({sel})[{index}]; \
             if (!el) return {{ status: 'missing' }}; const r = el.getBoundingClientRect(); \
             return {{ status: 'ok', x: r.left + r.width / 2, y: r.top + r.height / 2 }}; }})()",
            sel = selector_literal(selector)?
        );
        let value = self.evaluate(ctx, &expression).await?;

        match value.get("status").and_then(|s| s.as_str()) {
            Some("ok") => {}
            _ => {
                return Err(AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint(
                    format!("no element #{index} for '{selector}' in {}", ctx.label()),
                ))
            }
        }

        let point = ElementPoint {
            x: value.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0),
            y: value.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0),
        };

        match &ctx.frame {
            None => Ok(point),
            Some(frame) => {
                let (dx, dy) = self.frame_offset(ctx.page, &frame.frame_id).await?;
                Ok(point.offset_by(dx, dy))
            }
        }
    }

    async fn frame_owner(&self, page: PageId, frame_id: &str) -> Result<i64, AdapterError> {
        let owner = self
            .send_page_command(page, "DOM.getFrameOwner", json!({ "frameId": frame_id }))
            .await?;
        owner
            .get("backendNodeId")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("no owner element for frame {frame_id}"))
            })
    }

    /// Top-left of the frame's content box in page coordinates.
    async fn frame_offset(&self, page: PageId, frame_id: &str) -> Result<(f64, f64), AdapterError> {
        let node = self.frame_owner(page, frame_id).await?;
        let model = self
            .send_page_command(page, "DOM.getBoxModel", json!({ "backendNodeId": node }))
            .await?;
        let quad = model
            .get("model")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_array())
            .filter(|c| c.len() >= 2)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("no box model for frame {frame_id}"))
            })?;
        Ok((
            quad[0].as_f64().unwrap_or(0.0),
            quad[1].as_f64().unwrap_or(0.0),
        ))
    }

    /// Physical mouse click at the center of the `index`-th match.
    ///
    /// `click_count` > 1 produces a multi-click (2 = double, 3 = triple); `hold` is the
    /// delay between each press and release.
    pub async fn click(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        index: usize,
        hold: Duration,
        click_count: u32,
    ) -> Result<(), AdapterError> {
        let point = self.element_center(ctx, selector, index).await?;
        debug!(
            target: "cdp-adapter",
            context = %ctx.label(),
            selector,
            x = point.x,
            y = point.y,
            click_count,
            "dispatching click"
        );

        self.send_page_command(ctx.page, "Input.dispatchMouseEvent", input::mouse_move(point))
            .await?;
        for count in 1..=click_count.max(1) {
            self.send_page_command(
                ctx.page,
                "Input.dispatchMouseEvent",
                input::mouse_button("mousePressed", point, count),
            )
            .await?;
            if !hold.is_zero() {
                sleep(hold).await;
            }
            self.send_page_command(
                ctx.page,
                "Input.dispatchMouseEvent",
                input::mouse_button("mouseReleased", point, count),
            )
            .await?;
        }
        Ok(())
    }

    /// Press a named key (`Backspace`, `Enter`, `Tab`, ...) on the focused element.
    pub async fn press_key(&self, page: PageId, key: &str) -> Result<(), AdapterError> {
        let (down, up) = input::named_key_events(key).ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(format!("unsupported key '{key}'"))
        })?;
        self.send_page_command(page, "Input.dispatchKeyEvent", down)
            .await?;
        self.send_page_command(page, "Input.dispatchKeyEvent", up)
            .await?;
        Ok(())
    }

    /// Type `text` one character at a time into whatever has focus.
    pub async fn type_text(
        &self,
        page: PageId,
        text: &str,
        delay: Duration,
    ) -> Result<(), AdapterError> {
        for (idx, ch) in text.chars().enumerate() {
            if idx > 0 && !delay.is_zero() {
                sleep(delay).await;
            }
            let (down, up) = input::char_key_events(ch);
            self.send_page_command(page, "Input.dispatchKeyEvent", down)
                .await?;
            self.send_page_command(page, "Input.dispatchKeyEvent", up)
                .await?;
        }
        Ok(())
    }

    /// Text and `data-value` of every element matching `selector`, in document order.
    pub async fn list_items(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<Vec<ListItemSnapshot>, AdapterError> {
        let expression = format!(
            "Array.from(document.querySelectorAll({sel})).map(el => ({{ \
             text: (el.textContent ?? ''), dataValue: el.getAttribute('data-value') }}))",
            sel = selector_literal(selector)?
        );
        let value = self.evaluate(ctx, &expression).await?;
        serde_json::from_value(value).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("malformed list snapshot: {err}"))
        })
    }

    pub async fn screenshot(&self, page: PageId) -> Result<Vec<u8>, AdapterError> {
        let response = self
            .send_page_command(page, "Page.captureScreenshot", json!({ "format": "png" }))
            .await?;
        let data = response
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal).with_hint("missing screenshot data")
            })?;
        STANDARD
            .decode(data)
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
    }

    /// Last URL seen for `page` through navigation or target events.
    pub fn recent_url(&self, page: PageId) -> Option<String> {
        self.registry.get(&page).and_then(|ctx| ctx.recent_url)
    }

    pub async fn set_user_agent(&self, page: PageId, user_agent: &str) -> Result<(), AdapterError> {
        self.send_page_command(
            page,
            "Emulation.setUserAgentOverride",
            json!({ "userAgent": user_agent }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_viewport(&self, page: PageId, viewport: Viewport) -> Result<(), AdapterError> {
        self.send_page_command(
            page,
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": viewport.width,
                "height": viewport.height,
                "deviceScaleFactor": 1,
                "mobile": false,
            }),
        )
        .await?;
        Ok(())
    }

    fn page_session(&self, page: PageId) -> Result<String, AdapterError> {
        self.registry.get_cdp_session(&page).ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("missing cdp session for {page}"))
        })
    }

    async fn send_command(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        self.transport
            .send_command(CommandTarget::Browser, method, params)
            .await
    }

    async fn send_page_command(
        &self,
        page: PageId,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let session = self.page_session(page)?;
        self.transport
            .send_command(CommandTarget::Session(session), method, params)
            .await
    }

    async fn event_loop(self: Arc<Self>) {
        debug!(target: "cdp-adapter", "event loop entered");
        const MIN_BACKOFF: Duration = Duration::from_millis(100);
        const MAX_BACKOFF: Duration = Duration::from_secs(5);
        let mut backoff = MIN_BACKOFF;

        loop {
            select! {
                _ = self.shutdown.cancelled() => break,
                event = self.transport.next_event() => {
                    match event {
                        Some(ev) => {
                            backoff = MIN_BACKOFF;
                            if let Err(err) = self.process_event(ev).await {
                                warn!(target: "cdp-adapter", ?err, "cdp event handling error");
                            }
                        }
                        None => {
                            if self.shutdown.is_cancelled() {
                                break;
                            }
                            self.handle_transport_disconnect();
                            warn!(target: "cdp-adapter", "transport stream ended; attempting restart");
                            if let Err(err) = self.transport.start().await {
                                warn!(target: "cdp-adapter", ?err, "transport restart failed");
                            }
                            sleep(backoff).await;
                            backoff = (backoff + MIN_BACKOFF).min(MAX_BACKOFF);
                        }
                    }
                }
            }
        }
        debug!(target: "cdp-adapter", "event loop exiting");
    }

    fn handle_transport_disconnect(&self) {
        let pages = self.registry.pages();
        if !pages.is_empty() {
            warn!(target: "cdp-adapter", pages = pages.len(), "cdp transport lost; active pages were reset");
        }
        self.registry.clear();
        self.targets.clear();
        self.sessions.clear();
        self.frame_sessions.clear();
    }

    async fn process_event(&self, event: TransportEvent) -> Result<(), AdapterError> {
        match event.method.as_str() {
            "Target.targetCreated" => self.on_target_created(event.params),
            "Target.targetDestroyed" => self.on_target_destroyed(event.params),
            "Target.attachedToTarget" => self.on_target_attached(event).await,
            "Target.detachedFromTarget" => self.on_target_detached(event.params),
            "Target.targetInfoChanged" => self.on_target_info_changed(event.params),
            _ => {
                debug!(target: "cdp-adapter", method = %event.method, "unhandled cdp event");
                Ok(())
            }
        }
    }

    fn on_target_created(&self, params: Value) -> Result<(), AdapterError> {
        let payload: TargetInfoParams = decode(params)?;
        if payload.target_info.target_type != "page" {
            return Ok(());
        }

        let target_id = payload.target_info.target_id;
        if self.targets.contains_key(&target_id) {
            return Ok(());
        }
        let page = PageId::new();
        self.targets.insert(target_id.clone(), page);
        self.registry
            .insert_page(page, SessionId::new(), Some(target_id), None);
        if let Some(url) = payload.target_info.url.filter(|u| !u.is_empty()) {
            self.registry.set_recent_url(&page, url);
        }
        debug!(target: "cdp-adapter", %page, "page target created");
        Ok(())
    }

    fn on_target_destroyed(&self, params: Value) -> Result<(), AdapterError> {
        let payload: TargetDestroyedParams = decode(params)?;
        if let Some((_, page)) = self.targets.remove(&payload.target_id) {
            self.sessions.retain(|_, v| *v != page);
            self.frame_sessions.retain(|_, v| *v != page);
            self.registry.remove_page(&page);
            debug!(target: "cdp-adapter", %page, "page target destroyed");
        }
        Ok(())
    }

    async fn on_target_attached(&self, event: TransportEvent) -> Result<(), AdapterError> {
        let payload: AttachedToTargetParams = decode(event.params)?;
        let info = payload.target_info;

        match info.target_type.as_str() {
            "page" => {
                let page = match self.targets.get(&info.target_id) {
                    Some(entry) => *entry.value(),
                    None => {
                        // Attached before targetCreated was observed.
                        let page = PageId::new();
                        self.targets.insert(info.target_id.clone(), page);
                        self.registry.insert_page(
                            page,
                            SessionId::new(),
                            Some(info.target_id.clone()),
                            None,
                        );
                        page
                    }
                };
                self.sessions.insert(payload.session_id.clone(), page);
                self.registry.set_cdp_session(&page, payload.session_id);
            }
            "iframe" => {
                let parent = event.session_id.as_deref().and_then(|parent| {
                    self.sessions
                        .get(parent)
                        .map(|e| *e.value())
                        .or_else(|| self.frame_sessions.get(parent).map(|e| *e.value()))
                });
                let Some(page) = parent else {
                    debug!(target: "cdp-adapter", frame = %info.target_id, "iframe attached to unknown session");
                    return Ok(());
                };

                self.frame_sessions.insert(payload.session_id.clone(), page);
                self.registry.upsert_frame_target(
                    &page,
                    FrameTarget {
                        target_id: info.target_id.clone(),
                        cdp_session: payload.session_id.clone(),
                        url: info.url.filter(|u| !u.is_empty()),
                    },
                );
                debug!(target: "cdp-adapter", %page, frame = %info.target_id, "out-of-process frame attached");

                // Nested out-of-process frames attach through this session.
                if let Err(err) = self
                    .transport
                    .send_command(
                        CommandTarget::Session(payload.session_id),
                        "Target.setAutoAttach",
                        auto_attach_params(),
                    )
                    .await
                {
                    debug!(target: "cdp-adapter", ?err, "nested frame auto-attach failed");
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_target_detached(&self, params: Value) -> Result<(), AdapterError> {
        let payload: DetachedFromTargetParams = decode(params)?;
        self.sessions.remove(&payload.session_id);
        if self.frame_sessions.remove(&payload.session_id).is_some() {
            self.registry.remove_frame_session(&payload.session_id);
        }
        Ok(())
    }

    fn on_target_info_changed(&self, params: Value) -> Result<(), AdapterError> {
        let payload: TargetInfoParams = decode(params)?;
        if let Some(entry) = self.targets.get(&payload.target_info.target_id) {
            if let Some(url) = payload.target_info.url.filter(|u| !u.is_empty()) {
                self.registry.set_recent_url(entry.value(), url);
            }
        }
        Ok(())
    }
}

fn auto_attach_params() -> Value {
    json!({
        "autoAttach": true,
        "waitForDebuggerOnStart": false,
        "flatten": true,
    })
}

fn oopif_context(page: PageId, target: &FrameTarget) -> BrowsingContext {
    BrowsingContext::frame(
        page,
        FrameHandle {
            frame_id: target.target_id.clone(),
            url: target.url.clone(),
            session: Some(target.cdp_session.clone()),
            execution_context_id: None,
        },
    )
}

/// Depth-first (document order) list of `(frame id, url)` below `node`, excluding `node`.
fn collect_child_frames(node: &Value, out: &mut Vec<(String, Option<String>)>) {
    let Some(children) = node.get("childFrames").and_then(|c| c.as_array()) else {
        return;
    };
    for child in children {
        let frame = child.get("frame");
        if let Some(id) = frame.and_then(|f| f.get("id")).and_then(|v| v.as_str()) {
            let url = frame
                .and_then(|f| f.get("url"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            out.push((id.to_string(), url));
        }
        collect_child_frames(child, out);
    }
}

fn selector_literal(selector: &str) -> Result<String, AdapterError> {
    serde_json::to_string(selector)
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(params: Value) -> Result<T, AdapterError> {
    serde_json::from_value(params)
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct TargetInfoParams {
    #[serde(rename = "targetInfo")]
    target_info: TargetInfoPayload,
}

#[derive(Debug, Deserialize)]
struct TargetDestroyedParams {
    #[serde(rename = "targetId")]
    target_id: String,
}

#[derive(Debug, Deserialize)]
struct AttachedToTargetParams {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "targetInfo")]
    target_info: TargetInfoPayload,
}

#[derive(Debug, Deserialize)]
struct DetachedFromTargetParams {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct TargetInfoPayload {
    #[serde(rename = "targetId")]
    target_id: String,
    #[serde(rename = "type")]
    target_type: String,
    url: Option<String>,
}
