//! Select primitive - pick an item from an already-open dropdown list

use crate::{
    errors::ActionError,
    matching::select_match,
    primitives::{new_action_id, DefaultActionPrimitives},
    types::ActionOptions,
};
use tokio::time::Instant;
use tracing::{debug, info};

/// Execute select primitive
///
/// Single attempt, no retry:
/// 1. Resolve the list item selector (configured override first, then built-ins)
/// 2. Wait until the first item is interactable
/// 3. Snapshot all items matched by that selector in that context
/// 4. Match by exact text, then substring, then `data-value`
/// 5. Click the winning item
pub async fn execute_select(
    primitives: &DefaultActionPrimitives,
    text: &str,
    options: ActionOptions,
) -> Result<(), ActionError> {
    let settings = primitives.settings();
    let timeout = settings.timeout(&options);
    let hold = settings.click_hold(&options);
    let action_id = new_action_id();
    let started = Instant::now();

    info!(
        action_id = %action_id,
        item = %text,
        "Executing select primitive"
    );

    // 1-2. Locate the open list
    let candidates = settings.list_item_candidates()?;
    let target = primitives.resolve(&candidates, timeout).await?;
    primitives
        .await_visible(&target.context, &target.selector, timeout)
        .await?;

    // 3. Snapshot
    let items = primitives
        .port()
        .list_items(&target.context, &target.selector)
        .await
        .map_err(|err| ActionError::action_failed(&target.selector, err))?;
    debug!(
        selector = %target.selector,
        context = %target.context.label(),
        count = items.len(),
        "Collected list items"
    );

    // 4. Match
    let Some(found) = select_match(&items, text) else {
        info!(action_id = %action_id, item = %text, "No list item matched");
        return Err(ActionError::ItemNotFound(text.to_string()));
    };
    debug!(index = found.index, tier = ?found.tier, "Matched list item");

    // 5. Click
    primitives
        .port()
        .click(&target.context, &target.selector, found.index, hold, 1)
        .await
        .map_err(|err| ActionError::action_failed(&target.selector, err))?;

    info!(
        action_id = %action_id,
        tier = ?found.tier,
        latency_ms = started.elapsed().as_millis() as u64,
        "Select completed successfully"
    );
    Ok(())
}
