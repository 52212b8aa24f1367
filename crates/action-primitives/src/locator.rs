//! Context resolution: find which document (main or any frame) currently holds a match.

use std::time::Duration;

use cdp_adapter::BrowsingContext;
use tokio::time::{self, sleep, Instant};
use tracing::{debug, trace};

use crate::{
    errors::ActionError,
    ports::PagePort,
    types::{ResolvedTarget, SelectorCandidates},
};

/// Poll until one of `candidates` matches an element, main document first.
///
/// Each poll tests every candidate against the main document in order, then re-enumerates
/// frames and tests every candidate against each frame in order. Probe failures count as
/// no match and frame enumeration failures count as no frames. Every probe is bounded by
/// what is left of `timeout`; one that does not answer in time also counts as no match.
/// At least one full poll runs even with a zero timeout.
pub async fn resolve_target<P>(
    port: &P,
    candidates: &SelectorCandidates,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<ResolvedTarget, ActionError>
where
    P: PagePort + ?Sized,
{
    let started = Instant::now();
    let deadline = started + timeout;
    let mut polls = 0u32;

    loop {
        polls += 1;

        let main = port.main_context();
        if let Some(selector) = first_match(port, &main, candidates, deadline).await {
            debug!(selector = %selector, polls, "resolved in main document");
            return Ok(ResolvedTarget {
                context: main,
                selector,
            });
        }

        match time::timeout(remaining(deadline), port.frame_contexts()).await {
            Ok(Ok(frames)) => {
                for frame in frames {
                    if let Some(selector) = first_match(port, &frame, candidates, deadline).await {
                        debug!(selector = %selector, context = %frame.label(), polls, "resolved in frame");
                        return Ok(ResolvedTarget {
                            context: frame,
                            selector,
                        });
                    }
                }
            }
            Ok(Err(err)) => {
                trace!(?err, "frame enumeration failed; treating as no frames");
            }
            Err(_) => {
                trace!("frame enumeration did not answer before the deadline");
            }
        }

        if started.elapsed() >= timeout {
            debug!(polls, "resolution timed out");
            return Err(ActionError::ResolutionTimeout {
                candidates: candidates.as_slice().to_vec(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        sleep(poll_interval).await;
    }
}

async fn first_match<P>(
    port: &P,
    ctx: &BrowsingContext,
    candidates: &SelectorCandidates,
    deadline: Instant,
) -> Option<String>
where
    P: PagePort + ?Sized,
{
    for selector in candidates.iter() {
        match time::timeout(remaining(deadline), port.count_matches(ctx, selector)).await {
            Ok(Ok(count)) if count > 0 => return Some(selector.to_string()),
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                trace!(selector, context = %ctx.label(), ?err, "probe failed; treating as no match");
            }
            Err(_) => {
                trace!(selector, context = %ctx.label(), "probe did not answer before the deadline");
            }
        }
    }
    None
}

/// Budget left before `deadline`. A zero budget still lets a probe that answers at once
/// complete, since the probe is polled before the timer.
pub(crate) fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
