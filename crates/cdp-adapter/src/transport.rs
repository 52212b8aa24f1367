use std::collections::HashMap;
use std::convert::TryInto;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError;
use chromiumoxide_types::{CallId, CdpJsonEventMessage, Message, MethodId, Response};
use futures::{future::BoxFuture, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::util::extract_ws_url;

#[derive(Clone, Debug)]
pub struct TransportEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandTarget {
    Browser,
    Session(String),
}

/// Raw DevTools command/event channel. The adapter only ever talks JSON through this seam.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn start(&self) -> Result<(), AdapterError>;
    async fn next_event(&self) -> Option<TransportEvent>;
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError>;
    /// Tear down the browser link; later calls may relaunch it.
    async fn close(&self) {}
}

type LinkFactory =
    Arc<dyn Fn(CdpConfig) -> BoxFuture<'static, Result<Arc<BrowserLink>, AdapterError>> + Send + Sync>;

/// Transport backed by a chromiumoxide websocket connection, launching Chromium on demand.
#[derive(Clone)]
pub struct ChromiumTransport {
    cfg: CdpConfig,
    link: Arc<OnceCell<Mutex<Option<Arc<BrowserLink>>>>>,
    factory: LinkFactory,
}

impl ChromiumTransport {
    pub fn new(cfg: CdpConfig) -> Self {
        let factory: LinkFactory = Arc::new(|cfg: CdpConfig| {
            Box::pin(async move {
                let link = BrowserLink::open(cfg).await?;
                Ok(Arc::new(link))
            })
        });

        Self {
            cfg,
            link: Arc::new(OnceCell::new()),
            factory,
        }
    }

    async fn link(&self) -> Result<Arc<BrowserLink>, AdapterError> {
        let cell = self.link.get_or_init(|| async { Mutex::new(None) }).await;
        let mut guard = cell.lock().await;

        if let Some(link) = guard.as_ref() {
            if link.is_alive() {
                return Ok(link.clone());
            }
            warn!(target: "cdp-transport", "browser link lost; reconnecting");
        }

        let link = (self.factory)(self.cfg.clone()).await?;
        *guard = Some(link.clone());
        Ok(link)
    }

    fn deadline(&self) -> Duration {
        Duration::from_millis(self.cfg.default_deadline_ms)
    }

    #[cfg(test)]
    fn with_factory(cfg: CdpConfig, factory: LinkFactory) -> Self {
        Self {
            cfg,
            link: Arc::new(OnceCell::new()),
            factory,
        }
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn start(&self) -> Result<(), AdapterError> {
        let link = self.link().await?;

        link.send(
            CommandTarget::Browser,
            "Target.setDiscoverTargets",
            json!({ "discover": true }),
            self.deadline(),
        )
        .await?;

        link.send(
            CommandTarget::Browser,
            "Target.setAutoAttach",
            json!({
                "autoAttach": true,
                "waitForDebuggerOnStart": false,
                "flatten": true,
            }),
            self.deadline(),
        )
        .await?;

        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        match self.link().await {
            Ok(link) => link.next_event().await,
            Err(err) => {
                warn!(target: "cdp-transport", ?err, "transport not ready");
                None
            }
        }
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let link = self.link().await?;
        link.send(target, method, params, self.deadline()).await
    }

    async fn close(&self) {
        if let Some(cell) = self.link.get() {
            if let Some(link) = cell.lock().await.take() {
                link.terminate().await;
            }
        }
    }
}

struct ControlMessage {
    target: CommandTarget,
    method: String,
    params: Value,
    responder: oneshot::Sender<Result<Value, AdapterError>>,
}

type Inflight = HashMap<CallId, oneshot::Sender<Result<Value, AdapterError>>>;

/// A live websocket to one browser plus the tasks pumping it.
struct BrowserLink {
    command_tx: mpsc::Sender<ControlMessage>,
    events_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    pump_task: JoinHandle<()>,
    heartbeat_task: Option<JoinHandle<()>>,
    child: Mutex<Option<Child>>,
    alive: Arc<AtomicBool>,
}

impl BrowserLink {
    async fn open(cfg: CdpConfig) -> Result<Self, AdapterError> {
        let (child, ws_url) = match cfg.websocket_url.clone() {
            Some(url) => (None, url),
            None => {
                let browser_cfg = browser_config(&cfg)?;
                let mut child = browser_cfg.launch().map_err(|err| {
                    AdapterError::new(AdapterErrorKind::Internal)
                        .with_hint(format!("failed to launch chromium: {err}"))
                })?;
                let ws_url = extract_ws_url(&mut child).await?;
                (Some(child), ws_url)
            }
        };

        let conn = Connection::<CdpEventMessage>::connect(&ws_url)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        let (command_tx, command_rx) = mpsc::channel(128);
        let (events_tx, events_rx) = mpsc::channel(512);

        let alive = Arc::new(AtomicBool::new(true));
        let pump_alive = alive.clone();

        let pump_task = tokio::spawn(async move {
            let result = pump(conn, command_rx, events_tx).await;
            pump_alive.store(false, Ordering::Relaxed);
            if let Err(err) = result {
                error!(target: "cdp-transport", ?err, "transport loop terminated with error");
            }
        });

        let heartbeat_task = spawn_heartbeat(
            command_tx.clone(),
            alive.clone(),
            Duration::from_millis(cfg.heartbeat_interval_ms),
            Duration::from_millis(cfg.default_deadline_ms),
        );

        info!(
            target: "cdp-transport",
            url = %ws_url,
            launched = child.is_some(),
            "chromium connection established"
        );

        Ok(Self {
            command_tx,
            events_rx: Mutex::new(events_rx),
            pump_task,
            heartbeat_task,
            child: Mutex::new(child),
            alive,
        })
    }

    #[cfg(test)]
    fn test_stub() -> (Arc<Self>, Arc<AtomicBool>) {
        let (command_tx, _command_rx) = mpsc::channel(8);
        let (_events_tx, events_rx) = mpsc::channel(8);
        let alive = Arc::new(AtomicBool::new(true));
        let pump_task = tokio::spawn(futures::future::pending::<()>());

        (
            Arc::new(Self {
                command_tx,
                events_rx: Mutex::new(events_rx),
                pump_task,
                heartbeat_task: None,
                child: Mutex::new(None),
                alive: alive.clone(),
            }),
            alive,
        )
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn send(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, AdapterError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let message = ControlMessage {
            target,
            method: method.to_string(),
            params,
            responder: resp_tx,
        };

        self.command_tx
            .send(message)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        match tokio::time::timeout(deadline, resp_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint("command response channel closed")),
            Err(_) => Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("{method} timed out"))
                .retriable(true)),
        }
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        let mut guard = self.events_rx.lock().await;
        guard.recv().await
    }

    async fn terminate(&self) {
        self.alive.store(false, Ordering::Relaxed);
        self.pump_task.abort();
        if let Some(handle) = &self.heartbeat_task {
            handle.abort();
        }
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                warn!(target: "cdp-transport", ?err, "failed to kill chromium child");
            }
        }
    }
}

impl Drop for BrowserLink {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.pump_task.abort();
        if let Some(handle) = &self.heartbeat_task {
            handle.abort();
        }

        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(mut child) = guard.take() {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Err(err) = child.kill().await {
                            warn!(target: "cdp-transport", ?err, "failed to kill chromium child");
                        }
                    });
                } else {
                    debug!(target: "cdp-transport", "no tokio runtime available to kill chromium child");
                }
            }
        }
    }
}

fn spawn_heartbeat(
    sender: mpsc::Sender<ControlMessage>,
    alive: Arc<AtomicBool>,
    every: Duration,
    deadline: Duration,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }
    let response_deadline = deadline.min(Duration::from_secs(5));

    Some(tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately.
        ticker.tick().await;

        while alive.load(Ordering::Relaxed) {
            ticker.tick().await;

            let (resp_tx, resp_rx) = oneshot::channel();
            let message = ControlMessage {
                target: CommandTarget::Browser,
                method: "Browser.getVersion".to_string(),
                params: json!({}),
                responder: resp_tx,
            };
            if sender.send(message).await.is_err() {
                debug!(target: "cdp-transport", "heartbeat send failed (channel closed)");
                break;
            }

            match tokio::time::timeout(response_deadline, resp_rx).await {
                Ok(Ok(Ok(_))) => {}
                Ok(Ok(Err(err))) => {
                    warn!(target: "cdp-transport", ?err, "heartbeat command error");
                    break;
                }
                Ok(Err(_)) => break,
                Err(_) => {
                    warn!(target: "cdp-transport", "heartbeat timed out");
                    alive.store(false, Ordering::Relaxed);
                    break;
                }
            }
        }
    }))
}

/// Command-line flags for a launched browser.
fn launch_args(cfg: &CdpConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "--disable-background-networking",
        "--disable-background-timer-throttling",
        "--disable-breakpad",
        "--disable-component-update",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-popup-blocking",
        "--disable-sync",
        "--metrics-recording-only",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
        "--remote-allow-origins=*",
        "--use-mock-keychain",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if cfg.headless {
        args.push("--headless=new".into());
        args.push("--hide-scrollbars".into());
        args.push("--mute-audio".into());
    }
    if let Some((w, h)) = cfg.window_size {
        args.push(format!("--window-size={w},{h}"));
    }
    args
}

fn absolute_profile_dir(cfg: &CdpConfig) -> Result<PathBuf, AdapterError> {
    if cfg.user_data_dir.is_absolute() {
        return Ok(cfg.user_data_dir.clone());
    }
    let cwd = std::env::current_dir().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("failed to resolve cwd for user-data-dir: {err}"))
    })?;
    Ok(cwd.join(&cfg.user_data_dir))
}

fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    if cfg.executable.as_os_str().is_empty() {
        return Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint("no chrome/chromium executable found")
            .with_data(json!({ "hint": "Set CHROME_PATH or pass a websocket url." })));
    }
    if !cfg.executable.exists() {
        return Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!(
                "chrome executable not found at {}",
                cfg.executable.display()
            ))
            .with_data(json!({ "expected": cfg.executable })));
    }

    let profile_dir = absolute_profile_dir(cfg)?;
    fs::create_dir_all(&profile_dir).map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("failed to ensure user-data-dir: {err}"))
    })?;

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
        .launch_timeout(Duration::from_secs(20))
        .chrome_executable(cfg.executable.clone())
        .user_data_dir(profile_dir)
        .args(launch_args(cfg));

    if !cfg.headless {
        builder = builder.with_head();
    }
    if cfg.no_sandbox {
        builder = builder.no_sandbox();
    }

    builder.build().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("browser config error: {err}"))
    })
}

async fn pump(
    mut conn: Connection<CdpEventMessage>,
    mut command_rx: mpsc::Receiver<ControlMessage>,
    event_tx: mpsc::Sender<TransportEvent>,
) -> Result<(), AdapterError> {
    let mut inflight: Inflight = HashMap::new();

    loop {
        tokio::select! {
            Some(cmd) = command_rx.recv() => {
                submit(&mut conn, cmd, &mut inflight)?;
            }
            message = conn.next() => {
                match message {
                    Some(Ok(Message::Response(resp))) => {
                        if let Some(sender) = inflight.remove(&resp.id) {
                            let _ = sender.send(extract_payload(resp));
                        }
                    }
                    Some(Ok(Message::Event(event))) => {
                        if let Err(err) = forward_event(event, &event_tx).await {
                            warn!(target: "cdp-transport", ?err, "failed to forward event");
                        }
                    }
                    Some(Err(err)) => {
                        let adapter_err = map_cdp_error(err);
                        for (_, sender) in inflight.drain() {
                            let _ = sender.send(Err(adapter_err.clone()));
                        }
                        return Err(adapter_err);
                    }
                    None => {
                        let err = AdapterError::new(AdapterErrorKind::CdpIo)
                            .with_hint("cdp connection closed");
                        for (_, sender) in inflight.drain() {
                            let _ = sender.send(Err(err.clone()));
                        }
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn submit(
    conn: &mut Connection<CdpEventMessage>,
    cmd: ControlMessage,
    inflight: &mut Inflight,
) -> Result<(), AdapterError> {
    let session = match cmd.target {
        CommandTarget::Browser => None,
        CommandTarget::Session(session_id) => Some(CdpSessionId::from(session_id)),
    };

    let method_id: MethodId = cmd.method.clone().into();
    match conn.submit_command(method_id, session, cmd.params) {
        Ok(call_id) => {
            inflight.insert(call_id, cmd.responder);
            Ok(())
        }
        Err(err) => {
            let adapter_err = AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string());
            let _ = cmd.responder.send(Err(adapter_err.clone()));
            Err(adapter_err)
        }
    }
}

async fn forward_event(
    event: CdpEventMessage,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> Result<(), AdapterError> {
    let raw: CdpJsonEventMessage = event.try_into().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("failed to decode cdp event: {err}"))
    })?;

    event_tx
        .send(TransportEvent {
            method: raw.method.into_owned(),
            params: raw.params,
            session_id: raw.session_id,
        })
        .await
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
}

fn extract_payload(resp: Response) -> Result<Value, AdapterError> {
    if let Some(result) = resp.result {
        Ok(result)
    } else if let Some(error) = resp.error {
        Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!("cdp error {}: {}", error.code, error.message))
            .retriable(error.code >= 500))
    } else {
        Err(AdapterError::new(AdapterErrorKind::Internal).with_hint("empty cdp response"))
    }
}

fn map_cdp_error(err: CdpError) -> AdapterError {
    let hint = err.to_string();
    match err {
        CdpError::Timeout => AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(hint)
            .retriable(true),
        CdpError::JavascriptException(_) => {
            AdapterError::new(AdapterErrorKind::ScriptException).with_hint(hint)
        }
        CdpError::Serde(_) | CdpError::FrameNotFound(_) => {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(hint)
        }
        _ => AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(hint)
            .retriable(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn reconnects_when_link_dies() {
        let opened = Arc::new(AtomicUsize::new(0));
        let flags = Arc::new(Mutex::new(Vec::<Arc<AtomicBool>>::new()));

        let factory: LinkFactory = {
            let opened = opened.clone();
            let flags = flags.clone();
            Arc::new(move |_cfg: CdpConfig| {
                let opened = opened.clone();
                let flags = flags.clone();
                Box::pin(async move {
                    opened.fetch_add(1, Ordering::SeqCst);
                    let (link, alive) = BrowserLink::test_stub();
                    flags.lock().await.push(alive);
                    Ok(link)
                })
            })
        };

        let transport = ChromiumTransport::with_factory(CdpConfig::default(), factory);

        let first = transport.link().await.expect("link #1");
        let again = transport.link().await.expect("cached link");
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        flags.lock().await[0].store(false, Ordering::SeqCst);

        let second = transport.link().await.expect("link #2");
        assert_eq!(opened.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn launch_args_follow_headless_and_window_size() {
        let cfg = CdpConfig {
            headless: true,
            window_size: Some((1280, 720)),
            ..CdpConfig::default()
        };
        let args = launch_args(&cfg);
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(args.iter().any(|a| a == "--window-size=1280,720"));

        let headed = CdpConfig {
            headless: false,
            window_size: None,
            ..CdpConfig::default()
        };
        let args = launch_args(&headed);
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(!args.iter().any(|a| a.starts_with("--window-size")));
    }

    #[test]
    fn missing_executable_is_reported() {
        let cfg = CdpConfig {
            executable: PathBuf::from("/definitely/not/here/chrome"),
            ..CdpConfig::default()
        };
        let err = browser_config(&cfg).expect_err("missing binary must fail");
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
        assert!(err.hint.unwrap_or_default().contains("not found"));
    }
}
