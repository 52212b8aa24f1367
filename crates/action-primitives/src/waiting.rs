//! Visibility gate: a coarse wait-for-visible followed by a strict layout check.

use std::time::Duration;

use cdp_adapter::{BrowsingContext, ElementLayout};
use tokio::time::{self, sleep, Instant};
use tracing::debug;

use crate::{errors::ActionError, locator::remaining, ports::PagePort};

/// Why `layout` is not interactable, or `None` when it is.
///
/// Interactable means present, non-zero width and height, not `display: none`,
/// not `visibility: hidden` and not fully transparent.
pub fn blocking_reason(layout: &ElementLayout) -> Option<String> {
    if !layout.exists {
        return Some("element not present".to_string());
    }
    if layout.width <= 0.0 || layout.height <= 0.0 {
        return Some(format!("zero size ({}x{})", layout.width, layout.height));
    }
    if layout.display == "none" {
        return Some("display: none".to_string());
    }
    if layout.visibility == "hidden" {
        return Some("visibility: hidden".to_string());
    }
    if is_transparent(&layout.opacity) {
        return Some("opacity: 0".to_string());
    }
    None
}

pub fn is_interactable(layout: &ElementLayout) -> bool {
    blocking_reason(layout).is_none()
}

fn is_transparent(opacity: &str) -> bool {
    let trimmed = opacity.trim();
    trimmed == "0" || trimmed.parse::<f64>().map(|v| v == 0.0).unwrap_or(false)
}

/// Block until the first match of `selector` in `ctx` is interactable.
///
/// Both phases share one deadline of `timeout` from entry. The strict check is evaluated at
/// least once. Probe errors and probes that outlive the deadline count as "not yet".
pub async fn await_visible<P>(
    port: &P,
    ctx: &BrowsingContext,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), ActionError>
where
    P: PagePort + ?Sized,
{
    let deadline = Instant::now() + timeout;
    let timed_out = |reason: String| ActionError::VisibilityTimeout {
        selector: selector.to_string(),
        timeout_ms: timeout.as_millis() as u64,
        reason,
    };

    match time::timeout(timeout, port.wait_for_selector_visible(ctx, selector, timeout)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(timed_out(format!("coarse visibility check failed: {err}"))),
        Err(_) => return Err(timed_out("coarse visibility check did not answer".to_string())),
    }

    loop {
        let reason = match time::timeout(remaining(deadline), port.layout(ctx, selector)).await {
            Ok(Ok(layout)) => match blocking_reason(&layout) {
                None => {
                    debug!(selector, context = %ctx.label(), "element interactable");
                    return Ok(());
                }
                Some(reason) => reason,
            },
            Ok(Err(err)) => format!("layout probe failed: {err}"),
            Err(_) => "layout probe did not answer".to_string(),
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(reason));
        }
        sleep(poll_interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible() -> ElementLayout {
        ElementLayout {
            exists: true,
            width: 120.0,
            height: 32.0,
            display: "block".into(),
            visibility: "visible".into(),
            opacity: "1".into(),
        }
    }

    #[test]
    fn visible_layout_passes() {
        assert!(is_interactable(&visible()));
        let faded = ElementLayout {
            opacity: "0.4".into(),
            ..visible()
        };
        assert!(is_interactable(&faded));
    }

    #[test]
    fn each_blocking_condition_is_reported() {
        let cases = [
            (
                ElementLayout {
                    exists: false,
                    ..visible()
                },
                "not present",
            ),
            (
                ElementLayout {
                    width: 0.0,
                    ..visible()
                },
                "zero size",
            ),
            (
                ElementLayout {
                    height: 0.0,
                    ..visible()
                },
                "zero size",
            ),
            (
                ElementLayout {
                    display: "none".into(),
                    ..visible()
                },
                "display",
            ),
            (
                ElementLayout {
                    visibility: "hidden".into(),
                    ..visible()
                },
                "visibility",
            ),
            (
                ElementLayout {
                    opacity: "0".into(),
                    ..visible()
                },
                "opacity",
            ),
        ];
        for (layout, expected) in cases {
            let reason = blocking_reason(&layout).expect("should block");
            assert!(reason.contains(expected), "{reason} vs {expected}");
        }
    }
}
