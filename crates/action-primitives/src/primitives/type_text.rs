//! Type text primitive - replace the contents of a field, retrying on failure

use crate::{
    errors::ActionError,
    primitives::{new_action_id, DefaultActionPrimitives},
    retry::with_retries,
    types::{ActionOptions, ResolvedTarget, SelectorCandidates},
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Execute type primitive
///
/// Every attempt runs from scratch:
/// 1. Resolve, wait for interactable, scroll into view
/// 2. Triple-click to focus and select existing content (best effort)
/// 3. Press Backspace to clear the selection (best effort)
/// 4. Type `text` one key at a time with the configured delay
pub async fn execute_type_text(
    primitives: &DefaultActionPrimitives,
    candidates: &SelectorCandidates,
    text: &str,
    options: ActionOptions,
) -> Result<(), ActionError> {
    let settings = primitives.settings();
    let timeout = settings.timeout(&options);
    let delay = settings.typing_delay(&options);
    let hold = Duration::from_millis(settings.click_delay_ms);
    let action_id = new_action_id();
    let started = Instant::now();

    info!(
        action_id = %action_id,
        candidates = ?candidates.as_slice(),
        text_len = text.chars().count(),
        delay_ms = delay.as_millis() as u64,
        "Executing type primitive"
    );

    with_retries(
        settings.retries(&options),
        settings.retry_delay(),
        &action_id,
        "type",
        |attempt| async move {
            let target = primitives.prepare(candidates, timeout).await?;
            debug!(
                attempt,
                selector = %target.selector,
                context = %target.context.label(),
                "Clearing and typing"
            );
            clear_field(primitives, &target, hold).await;
            primitives
                .port()
                .type_text(text, delay)
                .await
                .map_err(|err| ActionError::action_failed(&target.selector, err))
        },
    )
    .await?;

    info!(
        action_id = %action_id,
        latency_ms = started.elapsed().as_millis() as u64,
        "Type completed successfully"
    );
    Ok(())
}

/// Select-all via triple click, then delete. Failures only leave old content behind.
async fn clear_field(primitives: &DefaultActionPrimitives, target: &ResolvedTarget, hold: Duration) {
    let port = primitives.port();
    if let Err(err) = port
        .click(&target.context, &target.selector, 0, hold, 3)
        .await
    {
        debug!(selector = %target.selector, ?err, "triple-click failed; typing anyway");
    }
    if let Err(err) = port.press_key("Backspace").await {
        debug!(selector = %target.selector, ?err, "backspace failed; typing anyway");
    }
}
