use chromiumoxide::async_process::Child;
use futures::io::{AsyncBufReadExt, BufReader};
use futures::stream::StreamExt;
use tokio::time::{timeout, Duration};

use crate::error::{AdapterError, AdapterErrorKind};

/// Extract the DevTools websocket URL from Chromium stderr output.
pub async fn extract_ws_url(child: &mut Child) -> Result<String, AdapterError> {
    let stderr = child.stderr.take().ok_or_else(|| {
        AdapterError::new(AdapterErrorKind::CdpIo).with_hint("chromium process missing stderr handle")
    })?;
    let mut lines = BufReader::new(stderr).lines();
    let mut captured = Vec::new();

    let reader = async {
        while let Some(line) = lines.next().await {
            let line = line.map_err(|err| {
                AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string())
            })?;
            if let Some(ws) = parse_devtools_line(&line) {
                return Ok(ws);
            }
            captured.push(line);
        }
        Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!(
            "chromium exited before exposing devtools websocket url. stderr preview: {}",
            captured
                .iter()
                .take(8)
                .cloned()
                .collect::<Vec<_>>()
                .join(" | ")
        )))
    };

    timeout(Duration::from_secs(20), reader).await.map_err(|_| {
        AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint("timed out waiting for chromium devtools websocket url")
    })?
}

/// `DevTools listening on ws://127.0.0.1:9222/devtools/browser/<id>` -> the ws url.
pub fn parse_devtools_line(line: &str) -> Option<String> {
    let (_, ws) = line.rsplit_once("listening on ")?;
    let ws = ws.trim();
    (ws.starts_with("ws") && ws.contains("devtools/browser")).then(|| ws.to_string())
}
