//! Diagnostic capture: a screenshot and a short text report of the page state.

use std::path::{Path, PathBuf};

use cdp_adapter::{BrowsingContext, CdpAdapter, PageId};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::fs;
use tracing::{info, warn};

use crate::errors::SessionError;

/// Body text beyond this many characters is cut from the report.
pub const MAX_BODY_CHARS: usize = 2000;

const PAGE_STATE_SCRIPT: &str = r#"(() => ({
    url: window.location.href || "",
    title: document.title || "",
    text: document.body ? document.body.innerText || "" : ""
}))()"#;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageState {
    url: String,
    title: String,
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFiles {
    /// Absent when the screenshot could not be taken.
    pub screenshot: Option<PathBuf>,
    pub report: PathBuf,
}

/// Write `<label>-<timestamp>.png` and `<label>-<timestamp>.txt` into `dir`.
///
/// A failed screenshot still produces the text report.
pub async fn capture_snapshot(
    adapter: &CdpAdapter,
    page: PageId,
    dir: &Path,
    label: &str,
) -> Result<SnapshotFiles, SessionError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|err| SessionError::io(dir, err))?;
    let stem = snapshot_stem(label, Utc::now());

    let screenshot = match adapter.screenshot(page).await {
        Ok(png) => {
            let path = dir.join(format!("{stem}.png"));
            fs::write(&path, png)
                .await
                .map_err(|err| SessionError::io(&path, err))?;
            Some(path)
        }
        Err(err) => {
            warn!(%page, error = %err, "screenshot failed; writing text report only");
            None
        }
    };

    let state = match adapter
        .evaluate(&BrowsingContext::main(page), PAGE_STATE_SCRIPT)
        .await
    {
        Ok(value) => serde_json::from_value(value).unwrap_or_default(),
        Err(err) => {
            warn!(%page, error = %err, "page state unavailable for snapshot");
            PageState::default()
        }
    };

    let url = if state.url.is_empty() {
        adapter.recent_url(page).unwrap_or_default()
    } else {
        state.url
    };

    let report = dir.join(format!("{stem}.txt"));
    fs::write(&report, render_report(&url, &state.title, &state.text))
        .await
        .map_err(|err| SessionError::io(&report, err))?;

    info!(%page, report = %report.display(), "diagnostic snapshot written");
    Ok(SnapshotFiles { screenshot, report })
}

/// File stem: the label reduced to `[A-Za-z0-9_-]` plus a UTC timestamp.
pub fn snapshot_stem(label: &str, at: DateTime<Utc>) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = if cleaned.is_empty() {
        "snapshot".to_string()
    } else {
        cleaned
    };
    format!("{cleaned}-{}", at.format("%Y%m%dT%H%M%S%.3fZ"))
}

pub fn render_report(url: &str, title: &str, body: &str) -> String {
    format!(
        "URL: {url}\nTitle: {title}\n\n{}\n",
        truncate_chars(body, MAX_BODY_CHARS)
    )
}

/// First `max` characters of `text`, counted in chars rather than bytes.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
