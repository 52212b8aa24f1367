//! Configuration management module
//!
//! `AppConfig` is read from YAML and then overridden from the environment. Every
//! environment value is validated; a malformed one is an error, never silently dropped.

use std::path::{Path, PathBuf};

use action_primitives::InteractionSettings;
use cdp_adapter::{CdpConfig, Viewport};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::errors::SessionError;

/// Default config file relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "config/frameweave.yaml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserSection,
    pub timeouts: TimeoutSection,
    pub interaction: InteractionSection,
    pub diagnostics: DiagnosticsSection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    pub user_agent: Option<String>,
    pub viewport: Viewport,
    /// Chrome binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// Attach to an already running browser instead of launching one.
    pub ws_url: Option<String>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: None,
            viewport: Viewport::default(),
            executable: None,
            ws_url: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    pub navigation_ms: u64,
    pub selector_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            selector_ms: 15_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSection {
    pub typing_delay_ms: u64,
    pub click_delay_ms: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub dropdown_item_selector: Option<String>,
}

impl Default for InteractionSection {
    fn default() -> Self {
        let defaults = InteractionSettings::default();
        Self {
            typing_delay_ms: defaults.typing_delay_ms,
            click_delay_ms: defaults.click_delay_ms,
            retries: defaults.retries,
            retry_delay_ms: defaults.retry_delay_ms,
            dropdown_item_selector: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsSection {
    pub dir: PathBuf,
}

impl Default for DiagnosticsSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./snapshots"),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, SessionError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|err| SessionError::config(err.to_string()))
    }

    /// Read `path` if it exists; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, SessionError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_yaml_str(&raw)
                .map_err(|err| SessionError::config(format!("{}: {err}", path.display()))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file absent; using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(SessionError::io(path, err)),
        }
    }

    pub fn apply_process_env(&mut self) -> Result<(), SessionError> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `HEADLESS`, `USER_AGENT`, `VIEWPORT`, `CHROME_PATH`, `WS_URL`,
    /// `NAVIGATION_TIMEOUT`, `SELECTOR_TIMEOUT`, `TYPING_DELAY`,
    /// `DROPDOWN_ITEM_SELECTOR` and `SNAPSHOT_DIR`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(raw) = get("HEADLESS") {
            self.browser.headless = parse_bool("HEADLESS", &raw)?;
        }
        if let Some(raw) = get("USER_AGENT") {
            self.browser.user_agent = Some(raw);
        }
        if let Some(raw) = get("VIEWPORT") {
            self.browser.viewport = raw
                .parse()
                .map_err(|err| SessionError::config(format!("VIEWPORT: {err}")))?;
        }
        if let Some(raw) = get("CHROME_PATH") {
            self.browser.executable = Some(PathBuf::from(raw));
        }
        if let Some(raw) = get("WS_URL") {
            self.browser.ws_url = Some(raw);
        }
        if let Some(raw) = get("NAVIGATION_TIMEOUT") {
            self.timeouts.navigation_ms = parse_millis("NAVIGATION_TIMEOUT", &raw)?;
        }
        if let Some(raw) = get("SELECTOR_TIMEOUT") {
            self.timeouts.selector_ms = parse_millis("SELECTOR_TIMEOUT", &raw)?;
        }
        if let Some(raw) = get("TYPING_DELAY") {
            self.interaction.typing_delay_ms = parse_millis("TYPING_DELAY", &raw)?;
        }
        if let Some(raw) = get("DROPDOWN_ITEM_SELECTOR") {
            self.interaction.dropdown_item_selector = Some(raw);
        }
        if let Some(raw) = get("SNAPSHOT_DIR") {
            self.diagnostics.dir = PathBuf::from(raw);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.timeouts.navigation_ms == 0 {
            return Err(SessionError::config("timeouts.navigation_ms must be positive"));
        }
        if self.timeouts.selector_ms == 0 {
            return Err(SessionError::config("timeouts.selector_ms must be positive"));
        }
        let Viewport { width, height } = self.browser.viewport;
        if width == 0 || height == 0 {
            return Err(SessionError::config(format!(
                "browser.viewport must be non-zero (got {width}x{height})"
            )));
        }
        if let Some(ws) = &self.browser.ws_url {
            let parsed = Url::parse(ws)
                .map_err(|err| SessionError::config(format!("browser.ws_url '{ws}': {err}")))?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(SessionError::config(format!(
                    "browser.ws_url '{ws}' must use ws:// or wss://"
                )));
            }
        }
        if let Some(selector) = &self.interaction.dropdown_item_selector {
            if selector.trim().is_empty() {
                return Err(SessionError::config(
                    "interaction.dropdown_item_selector must not be blank",
                ));
            }
        }
        Ok(())
    }

    pub fn cdp_config(&self) -> CdpConfig {
        let mut cfg = CdpConfig::default();
        cfg.headless = self.browser.headless;
        if let Some(executable) = &self.browser.executable {
            cfg.executable = executable.clone();
        }
        cfg.websocket_url = self.browser.ws_url.clone();
        cfg.window_size = Some((self.browser.viewport.width, self.browser.viewport.height));
        cfg
    }

    pub fn interaction_settings(&self) -> InteractionSettings {
        InteractionSettings {
            selector_timeout_ms: self.timeouts.selector_ms,
            typing_delay_ms: self.interaction.typing_delay_ms,
            click_delay_ms: self.interaction.click_delay_ms,
            retries: self.interaction.retries,
            retry_delay_ms: self.interaction.retry_delay_ms,
            dropdown_item_selector: self.interaction.dropdown_item_selector.clone(),
            ..InteractionSettings::default()
        }
    }
}

/// `explicit`, else `./config/frameweave.yaml` if present, else `<config_dir>/frameweave/config.yaml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(LOCAL_CONFIG_PATH);
    if local.exists() {
        return local;
    }
    match dirs::config_dir() {
        Some(mut dir) => {
            dir.push("frameweave");
            dir.push("config.yaml");
            dir
        }
        None => local,
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, SessionError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SessionError::config(format!(
            "{key}: expected a boolean, got '{raw}'"
        ))),
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, SessionError> {
    raw.parse::<u64>().map_err(|_| {
        SessionError::config(format!(
            "{key}: expected a non-negative integer of milliseconds, got '{raw}'"
        ))
    })
}
