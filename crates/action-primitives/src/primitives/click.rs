//! Click primitive - click the first resolvable candidate, retrying on failure

use crate::{
    errors::ActionError,
    primitives::{new_action_id, DefaultActionPrimitives},
    retry::with_retries,
    types::{ActionOptions, SelectorCandidates},
};
use tokio::time::Instant;
use tracing::{debug, info};

/// Execute click primitive
///
/// Every attempt runs from scratch:
/// 1. Resolve the element across main document and frames
/// 2. Wait until it is interactable
/// 3. Scroll it into view (best effort)
/// 4. Press and release on its first match
pub async fn execute_click(
    primitives: &DefaultActionPrimitives,
    candidates: &SelectorCandidates,
    options: ActionOptions,
) -> Result<(), ActionError> {
    let settings = primitives.settings();
    let timeout = settings.timeout(&options);
    let hold = settings.click_hold(&options);
    let action_id = new_action_id();
    let started = Instant::now();

    info!(
        action_id = %action_id,
        candidates = ?candidates.as_slice(),
        timeout_ms = timeout.as_millis() as u64,
        "Executing click primitive"
    );

    with_retries(
        settings.retries(&options),
        settings.retry_delay(),
        &action_id,
        "click",
        |attempt| async move {
            let target = primitives.prepare(candidates, timeout).await?;
            debug!(
                attempt,
                selector = %target.selector,
                context = %target.context.label(),
                "Dispatching click"
            );
            primitives
                .port()
                .click(&target.context, &target.selector, 0, hold, 1)
                .await
                .map_err(|err| ActionError::action_failed(&target.selector, err))
        },
    )
    .await?;

    info!(
        action_id = %action_id,
        latency_ms = started.elapsed().as_millis() as u64,
        "Click completed successfully"
    );
    Ok(())
}
