use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use action_primitives::{
    ActionError, ActionOptions, ActionPrimitives, DefaultActionPrimitives, InteractionSettings,
    PagePort, SelectorCandidates,
};
use async_trait::async_trait;
use cdp_adapter::{
    AdapterError, AdapterErrorKind, BrowsingContext, ElementLayout, FrameHandle, ListItemSnapshot,
    PageId,
};
use tokio::time::{sleep, Instant};

#[derive(Clone)]
struct Element {
    appears_after: Duration,
    interactable_after: Option<Duration>,
    items: Vec<ListItemSnapshot>,
}

impl Element {
    fn ready() -> Self {
        Self {
            appears_after: Duration::ZERO,
            interactable_after: Some(Duration::ZERO),
            items: Vec::new(),
        }
    }

    fn appearing_after(ms: u64) -> Self {
        Self {
            appears_after: Duration::from_millis(ms),
            ..Self::ready()
        }
    }

    fn interactable_after(ms: u64) -> Self {
        Self {
            interactable_after: Some(Duration::from_millis(ms)),
            ..Self::ready()
        }
    }

    fn never_interactable() -> Self {
        Self {
            interactable_after: None,
            ..Self::ready()
        }
    }

    fn list(texts: &[(&str, Option<&str>)]) -> Self {
        Self {
            items: texts
                .iter()
                .map(|(text, value)| ListItemSnapshot {
                    text: text.to_string(),
                    data_value: value.map(str::to_string),
                })
                .collect(),
            ..Self::ready()
        }
    }
}

/// In-memory page whose elements appear and become interactable on a virtual timeline.
struct ScriptedPage {
    page: PageId,
    started: Instant,
    frames: Vec<BrowsingContext>,
    elements: HashMap<(String, String), Element>,
    failing_probes: HashSet<String>,
    frames_fail: bool,
    scroll_fails: bool,
    triple_click_fails: bool,
    probe_stall: Duration,
    layout_stall: Duration,
    click_failures: AtomicU32,
    log: Mutex<Vec<String>>,
}

impl ScriptedPage {
    fn new() -> Self {
        Self {
            page: PageId::new(),
            started: Instant::now(),
            frames: Vec::new(),
            elements: HashMap::new(),
            failing_probes: HashSet::new(),
            frames_fail: false,
            scroll_fails: false,
            triple_click_fails: false,
            probe_stall: Duration::ZERO,
            layout_stall: Duration::ZERO,
            click_failures: AtomicU32::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    fn with_frame(mut self, frame_id: &str) -> Self {
        let ctx = BrowsingContext::frame(
            self.page,
            FrameHandle {
                frame_id: frame_id.to_string(),
                url: None,
                session: None,
                execution_context_id: Some(self.frames.len() as i64 + 10),
            },
        );
        self.frames.push(ctx);
        self
    }

    /// `context` is `main` or `frame:<id>`.
    fn with_element(mut self, context: &str, selector: &str, element: Element) -> Self {
        self.elements
            .insert((context.to_string(), selector.to_string()), element);
        self
    }

    fn failing_click_attempts(self, n: u32) -> Self {
        self.click_failures.store(n, Ordering::SeqCst);
        self
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn calls(&self, prefix: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn present(&self, ctx: &BrowsingContext, selector: &str) -> Option<&Element> {
        self.elements
            .get(&(ctx.label(), selector.to_string()))
            .filter(|el| self.started.elapsed() >= el.appears_after)
    }

    fn fail(kind: AdapterErrorKind, hint: &str) -> AdapterError {
        AdapterError::new(kind).with_hint(hint)
    }
}

#[async_trait]
impl PagePort for ScriptedPage {
    fn main_context(&self) -> BrowsingContext {
        BrowsingContext::main(self.page)
    }

    async fn frame_contexts(&self) -> Result<Vec<BrowsingContext>, AdapterError> {
        self.record("frames".to_string());
        if self.frames_fail {
            return Err(Self::fail(AdapterErrorKind::CdpIo, "frame tree unavailable"));
        }
        Ok(self.frames.clone())
    }

    async fn count_matches(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<usize, AdapterError> {
        self.record(format!("count {} {}", ctx.label(), selector));
        if !self.probe_stall.is_zero() {
            sleep(self.probe_stall).await;
        }
        if self.failing_probes.contains(&ctx.label()) {
            return Err(Self::fail(AdapterErrorKind::ScriptException, "detached"));
        }
        Ok(self.present(ctx, selector).map(|_| 1).unwrap_or(0))
    }

    async fn wait_for_selector_visible(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), AdapterError> {
        let Some(element) = self.elements.get(&(ctx.label(), selector.to_string())) else {
            sleep(timeout).await;
            return Err(Self::fail(AdapterErrorKind::WaitTimeout, "never attached"));
        };
        let elapsed = self.started.elapsed();
        if elapsed >= element.appears_after {
            return Ok(());
        }
        let remaining = element.appears_after - elapsed;
        if remaining <= timeout {
            sleep(remaining).await;
            Ok(())
        } else {
            sleep(timeout).await;
            Err(Self::fail(AdapterErrorKind::WaitTimeout, "not visible"))
        }
    }

    async fn layout(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<ElementLayout, AdapterError> {
        if !self.layout_stall.is_zero() {
            sleep(self.layout_stall).await;
        }
        let Some(element) = self.present(ctx, selector) else {
            return Ok(ElementLayout::default());
        };
        let visible = ElementLayout {
            exists: true,
            width: 100.0,
            height: 24.0,
            display: "block".into(),
            visibility: "visible".into(),
            opacity: "1".into(),
        };
        let ready = element
            .interactable_after
            .map(|after| self.started.elapsed() >= after)
            .unwrap_or(false);
        Ok(if ready {
            visible
        } else {
            ElementLayout {
                display: "none".into(),
                ..visible
            }
        })
    }

    async fn scroll_into_view(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<bool, AdapterError> {
        self.record(format!("scroll {} {}", ctx.label(), selector));
        if self.scroll_fails {
            return Err(Self::fail(AdapterErrorKind::CdpIo, "scroll rejected"));
        }
        Ok(true)
    }

    async fn click(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
        index: usize,
        _hold: Duration,
        click_count: u32,
    ) -> Result<(), AdapterError> {
        self.record(format!(
            "click {} {} #{} x{}",
            ctx.label(),
            selector,
            index,
            click_count
        ));
        if click_count == 3 && self.triple_click_fails {
            return Err(Self::fail(AdapterErrorKind::CdpIo, "triple click dropped"));
        }
        if click_count == 1
            && self
                .click_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(Self::fail(AdapterErrorKind::TargetNotFound, "covered"));
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), AdapterError> {
        self.record(format!("key {key}"));
        Ok(())
    }

    async fn type_text(&self, text: &str, delay: Duration) -> Result<(), AdapterError> {
        self.record(format!("type {} {}ms", text, delay.as_millis()));
        Ok(())
    }

    async fn list_items(
        &self,
        ctx: &BrowsingContext,
        selector: &str,
    ) -> Result<Vec<ListItemSnapshot>, AdapterError> {
        self.record(format!("items {} {}", ctx.label(), selector));
        Ok(self
            .present(ctx, selector)
            .map(|el| el.items.clone())
            .unwrap_or_default())
    }
}

fn candidates(selectors: &[&str]) -> SelectorCandidates {
    SelectorCandidates::new(selectors.iter().copied()).unwrap()
}

fn primitives(page: &Arc<ScriptedPage>) -> DefaultActionPrimitives {
    DefaultActionPrimitives::new(page.clone())
}

fn quick() -> ActionOptions {
    ActionOptions::default().with_timeout(Duration::from_millis(1000))
}

#[tokio::test(start_paused = true)]
async fn main_document_is_preferred_over_frames() {
    let page = Arc::new(
        ScriptedPage::new()
            .with_frame("f1")
            .with_element("main", "#save", Element::ready())
            .with_element("frame:f1", "#save", Element::ready()),
    );

    primitives(&page)
        .click_element(&candidates(&["#save"]), quick())
        .await
        .unwrap();

    assert_eq!(page.calls("click"), vec!["click main #save #0 x1"]);
    assert!(page.calls("frames").is_empty());
}

#[tokio::test(start_paused = true)]
async fn every_candidate_is_tried_in_main_before_any_frame() {
    let page = Arc::new(
        ScriptedPage::new()
            .with_frame("f1")
            .with_element("frame:f1", "#primary", Element::ready())
            .with_element("main", ".fallback", Element::ready()),
    );

    let target = primitives(&page)
        .resolve(&candidates(&["#primary", ".fallback"]), Duration::from_secs(1))
        .await
        .unwrap();

    assert!(target.context.is_main());
    assert_eq!(target.selector, ".fallback");
    assert_eq!(
        page.calls("count"),
        vec!["count main #primary", "count main .fallback"]
    );
}

#[tokio::test(start_paused = true)]
async fn element_inside_frame_is_clicked_in_that_frame() {
    let page = Arc::new(
        ScriptedPage::new()
            .with_frame("outer")
            .with_frame("inner")
            .with_element("frame:inner", "button.pay", Element::ready()),
    );

    primitives(&page)
        .click_element(&candidates(&["button.pay"]), quick())
        .await
        .unwrap();

    assert_eq!(
        page.calls("count"),
        vec![
            "count main button.pay",
            "count frame:outer button.pay",
            "count frame:inner button.pay",
        ]
    );
    assert_eq!(page.calls("click"), vec!["click frame:inner button.pay #0 x1"]);
    assert_eq!(page.calls("scroll"), vec!["scroll frame:inner button.pay"]);
}

#[tokio::test(start_paused = true)]
async fn late_element_is_found_on_a_later_poll() {
    let page = Arc::new(ScriptedPage::new().with_element(
        "main",
        "#late",
        Element::appearing_after(600),
    ));
    let started = Instant::now();

    let target = primitives(&page)
        .resolve(&candidates(&["#late"]), Duration::from_secs(5))
        .await
        .unwrap();

    assert!(target.context.is_main());
    assert_eq!(started.elapsed(), Duration::from_millis(750));
    assert_eq!(page.calls("count").len(), 4);
}

#[tokio::test(start_paused = true)]
async fn unresolved_candidates_time_out_with_the_full_list() {
    let page = Arc::new(ScriptedPage::new().with_frame("f1"));
    let started = Instant::now();

    let err = primitives(&page)
        .resolve(&candidates(&["#a", "#b"]), Duration::from_millis(1000))
        .await
        .unwrap_err();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1250));
    match err {
        ActionError::ResolutionTimeout {
            candidates,
            timeout_ms,
        } => {
            assert_eq!(candidates, vec!["#a".to_string(), "#b".to_string()]);
            assert_eq!(timeout_ms, 1000);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_timeout_still_probes_once() {
    let page = Arc::new(ScriptedPage::new().with_element("main", "#now", Element::ready()));
    let target = primitives(&page)
        .resolve(&candidates(&["#now"]), Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(target.selector, "#now");

    let empty = Arc::new(ScriptedPage::new());
    let err = primitives(&empty)
        .resolve(&candidates(&["#missing"]), Duration::ZERO)
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(empty.calls("count").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn probe_and_enumeration_errors_do_not_abort_resolution() {
    let mut scripted = ScriptedPage::new()
        .with_frame("f1")
        .with_element("frame:f1", "#inside", Element::ready());
    scripted.failing_probes.insert("main".to_string());
    let page = Arc::new(scripted);

    let target = primitives(&page)
        .resolve(&candidates(&["#inside"]), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(target.context.label(), "frame:f1");

    let mut broken = ScriptedPage::new().with_frame("f1");
    broken.frames_fail = true;
    let broken = Arc::new(broken);
    let err = primitives(&broken)
        .resolve(&candidates(&["#inside"]), Duration::from_millis(500))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::ResolutionTimeout { .. }));
    assert_eq!(broken.calls("frames").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn stalled_probes_do_not_outlast_the_resolution_timeout() {
    let mut scripted = ScriptedPage::new().with_element("main", "#b", Element::ready());
    scripted.probe_stall = Duration::from_secs(30);
    let page = Arc::new(scripted);
    let started = Instant::now();

    let err = primitives(&page)
        .click_element(
            &candidates(&["#a", "#b"]),
            ActionOptions::default()
                .with_timeout(Duration::from_millis(1000))
                .with_retries(0),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::ResolutionTimeout { .. }), "{err}");
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1250), "{elapsed:?}");
    assert!(page.calls("click").is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_layout_probe_ends_at_the_visibility_deadline() {
    let mut scripted = ScriptedPage::new().with_element("main", "#slow", Element::ready());
    scripted.layout_stall = Duration::from_secs(30);
    let page = Arc::new(scripted);
    let started = Instant::now();

    let err = primitives(&page)
        .click_element(
            &candidates(&["#slow"]),
            ActionOptions::default()
                .with_timeout(Duration::from_millis(1000))
                .with_retries(0),
        )
        .await
        .unwrap_err();

    match err {
        ActionError::VisibilityTimeout { reason, .. } => {
            assert!(reason.contains("did not answer"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn click_waits_for_element_to_become_interactable() {
    let page = Arc::new(ScriptedPage::new().with_element(
        "main",
        "#submit",
        Element::interactable_after(300),
    ));
    let started = Instant::now();

    primitives(&page)
        .click_element(&candidates(&["#submit"]), quick())
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(300));
    assert_eq!(page.calls("click").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn hidden_element_reports_visibility_timeout() {
    let page = Arc::new(ScriptedPage::new().with_element(
        "main",
        "#ghost",
        Element::never_interactable(),
    ));

    let err = primitives(&page)
        .click_element(
            &candidates(&["#ghost"]),
            ActionOptions::default()
                .with_timeout(Duration::from_millis(500))
                .with_retries(0),
        )
        .await
        .unwrap_err();

    match err {
        ActionError::VisibilityTimeout {
            selector, reason, ..
        } => {
            assert_eq!(selector, "#ghost");
            assert!(reason.contains("display"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(page.calls("click").is_empty());
}

#[tokio::test(start_paused = true)]
async fn click_recovers_within_retry_budget() {
    let page = Arc::new(
        ScriptedPage::new()
            .with_element("main", "#flaky", Element::ready())
            .failing_click_attempts(2),
    );
    let started = Instant::now();

    primitives(&page)
        .click_element(&candidates(&["#flaky"]), quick())
        .await
        .unwrap();

    assert_eq!(page.calls("click").len(), 3);
    assert_eq!(page.calls("count").len(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(800));
}

#[tokio::test(start_paused = true)]
async fn click_returns_last_error_when_retries_run_out() {
    let page = Arc::new(
        ScriptedPage::new()
            .with_element("main", "#broken", Element::ready())
            .failing_click_attempts(10),
    );

    let err = primitives(&page)
        .click_element(&candidates(&["#broken"]), quick())
        .await
        .unwrap_err();

    match err {
        ActionError::ActionFailed { selector, source } => {
            assert_eq!(selector, "#broken");
            assert_eq!(source.kind, AdapterErrorKind::TargetNotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(page.calls("click").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn each_retry_gets_a_fresh_resolution_budget() {
    let page = Arc::new(ScriptedPage::new());
    let started = Instant::now();

    let err = primitives(&page)
        .click_element(
            &candidates(&["#never"]),
            ActionOptions::default()
                .with_timeout(Duration::from_millis(500))
                .with_retries(1),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::ResolutionTimeout { .. }));
    assert_eq!(started.elapsed(), Duration::from_millis(1400));
}

#[tokio::test(start_paused = true)]
async fn scroll_failures_are_ignored() {
    let mut scripted = ScriptedPage::new().with_element("main", "#btn", Element::ready());
    scripted.scroll_fails = true;
    let page = Arc::new(scripted);

    primitives(&page)
        .click_element(&candidates(&["#btn"]), quick())
        .await
        .unwrap();

    assert_eq!(page.calls("scroll").len(), 1);
    assert_eq!(page.calls("click").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn typing_clears_then_types_with_configured_delay() {
    let page = Arc::new(ScriptedPage::new().with_element("main", "#name", Element::ready()));

    primitives(&page)
        .type_into_field(&candidates(&["#name"]), "Ada", quick())
        .await
        .unwrap();

    let actions: Vec<String> = page
        .log
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with("click") || e.starts_with("key") || e.starts_with("type"))
        .cloned()
        .collect();
    assert_eq!(
        actions,
        vec!["click main #name #0 x3", "key Backspace", "type Ada 50ms"]
    );
}

#[tokio::test(start_paused = true)]
async fn typing_survives_a_failed_clear_and_honors_delay_override() {
    let mut scripted = ScriptedPage::new()
        .with_frame("login")
        .with_element("frame:login", "input[name=user]", Element::ready());
    scripted.triple_click_fails = true;
    let page = Arc::new(scripted);

    primitives(&page)
        .type_into_field(
            &candidates(&["input[name=user]"]),
            "grace",
            quick().with_delay(Duration::from_millis(5)),
        )
        .await
        .unwrap();

    assert_eq!(page.calls("type"), vec!["type grace 5ms"]);
    assert_eq!(page.calls("key"), vec!["key Backspace"]);
}

#[tokio::test(start_paused = true)]
async fn typing_runs_every_attempt_and_returns_the_last_error() {
    let page = Arc::new(ScriptedPage::new().with_element(
        "main",
        "#locked",
        Element::never_interactable(),
    ));
    let started = Instant::now();

    let err = primitives(&page)
        .type_into_field(
            &candidates(&["#locked"]),
            "hello",
            ActionOptions::default().with_timeout(Duration::from_millis(500)),
        )
        .await
        .unwrap_err();

    match err {
        ActionError::VisibilityTimeout { selector, .. } => assert_eq!(selector, "#locked"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(page.calls("count").len(), 3);
    assert!(page.calls("type").is_empty());
    assert_eq!(started.elapsed(), Duration::from_millis(2300));
}

#[tokio::test(start_paused = true)]
async fn select_prefers_exact_text_and_clicks_by_index() {
    let page = Arc::new(ScriptedPage::new().with_element(
        "main",
        ".lv-select-popup li",
        Element::list(&[("Export All", None), ("  Export ", None)]),
    ));

    primitives(&page)
        .select_dropdown_item("export", quick())
        .await
        .unwrap();

    assert_eq!(page.calls("click"), vec!["click main .lv-select-popup li #1 x1"]);
}

#[tokio::test(start_paused = true)]
async fn select_uses_configured_selector_before_builtins() {
    let page = Arc::new(
        ScriptedPage::new()
            .with_element(
                "main",
                ".menu .entry",
                Element::list(&[("Alpha", None), ("Beta", None)]),
            )
            .with_element(
                "main",
                ".lv-select-popup li",
                Element::list(&[("Beta", None)]),
            ),
    );
    let settings = InteractionSettings {
        dropdown_item_selector: Some(".menu .entry".into()),
        ..InteractionSettings::default()
    };

    DefaultActionPrimitives::with_settings(page.clone(), settings)
        .select_dropdown_item("beta", quick())
        .await
        .unwrap();

    assert_eq!(page.calls("click"), vec!["click main .menu .entry #1 x1"]);
}

#[tokio::test(start_paused = true)]
async fn select_falls_back_to_role_option_and_data_value_in_frames() {
    let page = Arc::new(ScriptedPage::new().with_frame("picker").with_element(
        "frame:picker",
        "[role=\"option\"]",
        Element::list(&[("Small", Some("sm")), ("Large", Some("lg"))]),
    ));

    primitives(&page)
        .select_dropdown_item("LG", quick())
        .await
        .unwrap();

    assert_eq!(
        page.calls("click"),
        vec!["click frame:picker [role=\"option\"] #1 x1"]
    );
}

#[tokio::test(start_paused = true)]
async fn select_reports_unmatched_text_verbatim_without_retrying() {
    let page = Arc::new(ScriptedPage::new().with_element(
        "main",
        "[data-value]",
        Element::list(&[("One", Some("1")), ("Two", Some("2"))]),
    ));

    let err = primitives(&page)
        .select_dropdown_item("  Missing ", quick())
        .await
        .unwrap_err();

    assert!(matches!(&err, ActionError::ItemNotFound(text) if text == "  Missing "));
    assert_eq!(err.to_string(), "Item not found in list:   Missing ");
    assert_eq!(page.calls("items").len(), 1);
    assert!(page.calls("click").is_empty());
}

#[tokio::test(start_paused = true)]
async fn select_click_failure_is_not_retried() {
    let page = Arc::new(
        ScriptedPage::new()
            .with_element(
                "main",
                ".lv-select-popup li",
                Element::list(&[("Only", None)]),
            )
            .failing_click_attempts(1),
    );

    let err = primitives(&page)
        .select_dropdown_item("only", quick())
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::ActionFailed { .. }));
    assert_eq!(page.calls("click").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn export_picks_first_exact_match_and_data_value_as_fallback() {
    let page = Arc::new(ScriptedPage::new().with_element(
        "main",
        ".lv-select-popup li",
        Element::list(&[
            ("Export Video", None),
            ("Exp", None),
            ("Export", None),
            (" export ", None),
        ]),
    ));
    primitives(&page)
        .select_dropdown_item("Export", quick())
        .await
        .unwrap();
    assert_eq!(page.calls("click"), vec!["click main .lv-select-popup li #2 x1"]);

    let by_value = Arc::new(ScriptedPage::new().with_element(
        "main",
        "[role=\"option\"]",
        Element::list(&[("Download", Some("download")), ("Share", Some("export"))]),
    ));
    primitives(&by_value)
        .select_dropdown_item("export", quick())
        .await
        .unwrap();
    assert_eq!(
        by_value.calls("click"),
        vec!["click main [role=\"option\"] #1 x1"]
    );
}
