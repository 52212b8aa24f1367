//! Bounded retry with a fixed pause between attempts.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::ActionError;

/// Run `attempt` up to `retries + 1` times and return the first success or the last error.
///
/// The pause is only taken between attempts, never after the final one. `attempt` receives
/// the 1-based attempt number.
pub async fn with_retries<T, F, Fut>(
    retries: u32,
    delay: Duration,
    action_id: &str,
    label: &str,
    mut attempt: F,
) -> Result<T, ActionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ActionError>>,
{
    let total = retries.saturating_add(1);
    let mut number = 1;
    loop {
        match attempt(number).await {
            Ok(value) => {
                if number > 1 {
                    debug!(action_id, action = label, attempt = number, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if number < total => {
                warn!(
                    action_id,
                    action = label,
                    attempt = number,
                    of = total,
                    error = %err,
                    "attempt failed; retrying"
                );
                sleep(delay).await;
                number += 1;
            }
            Err(err) => {
                warn!(action_id, action = label, attempts = total, error = %err, "giving up");
                return Err(err);
            }
        }
    }
}
