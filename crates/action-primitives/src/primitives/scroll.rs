//! Scroll stabilizer - bring an element into view without ever failing the action

use cdp_adapter::BrowsingContext;
use tracing::debug;

use crate::ports::PagePort;

/// Scroll the first match of `selector` into view. Errors and missing elements are ignored.
pub async fn ensure_in_view<P>(port: &P, ctx: &BrowsingContext, selector: &str)
where
    P: PagePort + ?Sized,
{
    match port.scroll_into_view(ctx, selector).await {
        Ok(true) => debug!(selector, context = %ctx.label(), "scrolled into view"),
        Ok(false) => debug!(selector, context = %ctx.label(), "nothing to scroll"),
        Err(err) => debug!(selector, context = %ctx.label(), ?err, "scroll failed; continuing"),
    }
}
