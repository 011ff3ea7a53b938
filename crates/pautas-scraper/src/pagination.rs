//! Multi-batch extraction for posts whose comment target exceeds what one
//! job can safely return.
//!
//! The job service has no cursor or offset, so consecutive jobs over the same
//! post overlap. Each batch is over-requested by 30% and deduplicated against
//! every comment already collected for the post. Pagination stops when the
//! target is reached, a batch fails or comes back empty, a batch adds fewer
//! than 30% of the ceiling in new comments, or the planned batches run out.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use pautas_core::{Comment, Platform};

use crate::error::ScraperError;
use crate::job::JobOutcome;
use crate::sleeper::Sleeper;

/// Per-platform batch ceiling and the pause between batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub ceiling: u32,
    pub pause: Duration,
}

impl BatchPolicy {
    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Facebook | Platform::TikTok => Self {
                ceiling: 2000,
                pause: Duration::from_secs(30),
            },
            Platform::Instagram => Self {
                ceiling: 1500,
                pause: Duration::from_secs(45),
            },
        }
    }

    /// New comments below this count end pagination.
    #[must_use]
    pub fn diminishing_returns_floor(&self) -> u32 {
        self.ceiling * 3 / 10
    }

    /// Number of batches planned for `target`.
    #[must_use]
    pub fn planned_batches(&self, target: u32) -> u32 {
        target.div_ceil(self.ceiling.max(1))
    }
}

/// `min(ceiling * 1.3, remaining * 1.3)` in integer arithmetic.
#[must_use]
pub fn plan_batch_size(ceiling: u32, remaining: u32) -> u32 {
    let capped = ceiling.saturating_mul(13) / 10;
    let wanted = remaining.saturating_add(remaining.saturating_mul(3) / 10);
    capped.min(wanted)
}

/// What one job contributed.
#[derive(Debug)]
pub enum BatchResult {
    Completed(Vec<Comment>),
    Unsuccessful(JobOutcome),
}

/// Drops later copies of any fingerprint, keeping first-seen order.
#[must_use]
pub fn dedup_comments(comments: Vec<Comment>) -> Vec<Comment> {
    let mut seen = HashSet::with_capacity(comments.len());
    comments
        .into_iter()
        .filter(|c| seen.insert(c.fingerprint()))
        .collect()
}

/// Collects up to `target` comments, running `run_batch(size)` once per batch.
///
/// A failure of the first batch is an error; later failures end pagination
/// with what was accumulated. An empty first batch yields `Ok(vec![])`.
///
/// # Errors
///
/// Returns the first batch's error, or [`ScraperError::JobUnsuccessful`] if
/// the first job ended in a non-succeeded state.
pub async fn paginate<Z, F, Fut>(
    policy: BatchPolicy,
    target: u32,
    sleeper: &Z,
    mut run_batch: F,
) -> Result<Vec<Comment>, ScraperError>
where
    Z: Sleeper,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<BatchResult, ScraperError>>,
{
    if target <= policy.ceiling {
        return match run_batch(target).await? {
            BatchResult::Completed(comments) => Ok(dedup_comments(comments)),
            BatchResult::Unsuccessful(outcome) => Err(ScraperError::JobUnsuccessful { outcome }),
        };
    }

    let planned = policy.planned_batches(target);
    let floor = policy.diminishing_returns_floor();
    let mut seen: HashSet<String> = HashSet::new();
    let mut accumulated: Vec<Comment> = Vec::new();

    tracing::info!(target, planned, ceiling = policy.ceiling, "paginated extraction");

    for batch in 1..=planned {
        let collected = u32::try_from(accumulated.len()).unwrap_or(u32::MAX);
        let remaining = target.saturating_sub(collected);
        if remaining == 0 {
            break;
        }
        let size = plan_batch_size(policy.ceiling, remaining);
        tracing::info!(batch, planned, size, "requesting batch");

        let comments = match run_batch(size).await {
            Ok(BatchResult::Completed(comments)) => comments,
            Ok(BatchResult::Unsuccessful(outcome)) if batch == 1 => {
                return Err(ScraperError::JobUnsuccessful { outcome });
            }
            Err(e) if batch == 1 => return Err(e),
            Ok(BatchResult::Unsuccessful(outcome)) => {
                tracing::warn!(batch, %outcome, kept = accumulated.len(), "batch failed; keeping partial result");
                break;
            }
            Err(e) => {
                tracing::warn!(batch, error = %e, kept = accumulated.len(), "batch failed; keeping partial result");
                break;
            }
        };

        if comments.is_empty() {
            tracing::info!(batch, "batch returned nothing; stopping");
            break;
        }

        let mut new_in_batch = 0u32;
        for comment in comments {
            if seen.insert(comment.fingerprint()) {
                accumulated.push(comment);
                new_in_batch += 1;
            }
        }
        tracing::info!(batch, new = new_in_batch, total = accumulated.len(), "batch merged");

        if accumulated.len() >= target as usize {
            break;
        }
        if new_in_batch < floor {
            tracing::info!(batch, new = new_in_batch, floor, "diminishing returns; stopping");
            break;
        }
        if batch < planned {
            sleeper.sleep(policy.pause).await;
        }
    }

    Ok(dedup_comments(accumulated))
}
