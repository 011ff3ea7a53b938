//! Bounded, linearly backed-off retries around one full extraction of a URL.
//!
//! Modelled as a small state machine so the wait between attempts goes
//! through a [`Sleeper`]:
//!
//! ```text
//! Attempting(n) --valid comments--> done: Extracted
//! Attempting(n) --empty success---> done: NoComments
//! Attempting(n) --error/all invalid--> Retrying(n + 1, wait n * step) --> Attempting(n + 1)
//!                                   \-> Exhausted (n == max_attempts)
//! ```

use std::future::Future;
use std::time::Duration;

use pautas_core::{Comment, RunReport};

use crate::error::ScraperError;
use crate::sleeper::Sleeper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait after attempt `n` is `n * backoff_step`.
    pub backoff_step: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Result of retrying one URL.
#[derive(Debug)]
pub enum RetryOutcome {
    /// At least one valid comment.
    Extracted(Vec<Comment>),
    /// The job succeeded with nothing to return. Not retried.
    NoComments,
    /// Every attempt failed.
    Exhausted,
}

enum State {
    Attempting(u32),
    Retrying { next: u32, wait: Duration },
    Exhausted,
}

pub struct RetryController<'a, Z> {
    policy: RetryPolicy,
    sleeper: &'a Z,
}

impl<'a, Z: Sleeper> RetryController<'a, Z> {
    #[must_use]
    pub fn new(policy: RetryPolicy, sleeper: &'a Z) -> Self {
        Self { policy, sleeper }
    }

    /// Runs `extract` until it yields valid comments, an empty success, or
    /// attempts run out. Updates the run statistics in `report` and records
    /// `url` as failed on exhaustion.
    pub async fn execute<F, Fut>(&self, url: &str, report: &mut RunReport, mut extract: F) -> RetryOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<Comment>, ScraperError>>,
    {
        let mut state = State::Attempting(1);

        loop {
            state = match state {
                State::Attempting(attempt) => {
                    tracing::info!(%url, attempt, max_attempts = self.policy.max_attempts, "extracting");
                    match extract().await {
                        Ok(items) if items.is_empty() => {
                            tracing::info!(%url, "job succeeded without comments");
                            return RetryOutcome::NoComments;
                        }
                        Ok(items) => {
                            let valid = validate(items, report);
                            if !valid.is_empty() {
                                record_success(&valid, report);
                                tracing::info!(%url, attempt, comments = valid.len(), "extraction succeeded");
                                return RetryOutcome::Extracted(valid);
                            }
                            tracing::warn!(%url, attempt, "every extracted comment was invalid");
                            self.after_failure(attempt)
                        }
                        Err(e) => {
                            tracing::warn!(%url, attempt, error = %e, "extraction attempt failed");
                            self.after_failure(attempt)
                        }
                    }
                }
                State::Retrying { next, wait } => {
                    tracing::info!(%url, wait_secs = wait.as_secs(), "backing off before retry");
                    self.sleeper.sleep(wait).await;
                    State::Attempting(next)
                }
                State::Exhausted => {
                    tracing::error!(%url, attempts = self.policy.max_attempts, "all extraction attempts failed");
                    report.record_failure(url);
                    return RetryOutcome::Exhausted;
                }
            };
        }
    }

    fn after_failure(&self, attempt: u32) -> State {
        if attempt >= self.policy.max_attempts {
            State::Exhausted
        } else {
            State::Retrying {
                next: attempt + 1,
                wait: self.policy.backoff_after(attempt),
            }
        }
    }
}

/// Keeps comments with a non-blank post URL and text; counts the rest.
fn validate(items: Vec<Comment>, report: &mut RunReport) -> Vec<Comment> {
    let total = items.len();
    let valid: Vec<Comment> = items
        .into_iter()
        .filter(|c| !c.post_url.trim().is_empty() && !c.text.trim().is_empty())
        .collect();
    let dropped = total - valid.len();
    if dropped > 0 {
        tracing::warn!(dropped, "dropped comments missing required fields");
        report.stats.invalid_comments = report
            .stats
            .invalid_comments
            .saturating_add(u32::try_from(dropped).unwrap_or(u32::MAX));
    }
    valid
}

fn record_success(comments: &[Comment], report: &mut RunReport) {
    let replies = comments.iter().filter(|c| c.is_reply).count();
    let main = comments.len() - replies;
    let stats = &mut report.stats;
    stats.successful += 1;
    stats.total_main_comments = stats
        .total_main_comments
        .saturating_add(u32::try_from(main).unwrap_or(u32::MAX));
    stats.total_replies = stats
        .total_replies
        .saturating_add(u32::try_from(replies).unwrap_or(u32::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use pautas_core::{CampaignInfo, Platform};

    use crate::job::JobOutcome;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    const URL: &str = "https://www.tiktok.com/@brand/video/7300000000000000000";

    fn comment(text: &str, is_reply: bool) -> Comment {
        Comment {
            platform: Platform::TikTok,
            post_url: URL.to_owned(),
            post_url_original: URL.to_owned(),
            post_number: 1,
            author_name: Some("fan".to_owned()),
            author_url: None,
            text: text.to_owned(),
            created_time: Some("1700000000".to_owned()),
            likes_count: 0,
            replies_count: 0,
            is_reply,
            parent_comment_id: is_reply.then(|| "1".to_owned()),
            raw_source: None,
            campaign: Arc::new(CampaignInfo::default()),
        }
    }

    fn failure() -> ScraperError {
        ScraperError::JobUnsuccessful {
            outcome: JobOutcome::Failed,
        }
    }

    async fn run(
        script: Vec<Result<Vec<Comment>, ScraperError>>,
        report: &mut RunReport,
        sleeper: &RecordingSleeper,
    ) -> (RetryOutcome, usize) {
        let script = Mutex::new(VecDeque::from(script));
        let calls = Mutex::new(0usize);
        let controller = RetryController::new(RetryPolicy::new(3), sleeper);
        let outcome = controller
            .execute(URL, report, || {
                *calls.lock().unwrap() += 1;
                let next = script.lock().unwrap().pop_front().unwrap_or_else(|| Err(failure()));
                async move { next }
            })
            .await;
        (outcome, calls.into_inner().unwrap())
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let sleeper = RecordingSleeper::default();
        let mut report = RunReport::start();
        let (outcome, calls) = run(
            vec![Ok(vec![comment("hola", false), comment("re: hola", true)])],
            &mut report,
            &sleeper,
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::Extracted(ref c) if c.len() == 2));
        assert_eq!(calls, 1);
        assert_eq!(report.stats.successful, 1);
        assert_eq!(report.stats.total_main_comments, 1);
        assert_eq!(report.stats.total_replies, 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exhaustion_records_failure_with_linear_backoff() {
        let sleeper = RecordingSleeper::default();
        let mut report = RunReport::start();
        let (outcome, calls) = run(vec![Err(failure()), Err(failure()), Err(failure())], &mut report, &sleeper).await;

        assert!(matches!(outcome, RetryOutcome::Exhausted));
        assert_eq!(calls, 3);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.failed_urls, vec![URL.to_owned()]);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(30), Duration::from_secs(60)]
        );
    }

    #[tokio::test]
    async fn empty_success_is_not_retried() {
        let sleeper = RecordingSleeper::default();
        let mut report = RunReport::start();
        let (outcome, calls) = run(vec![Ok(Vec::new())], &mut report, &sleeper).await;

        assert!(matches!(outcome, RetryOutcome::NoComments));
        assert_eq!(calls, 1);
        assert_eq!(report.stats.failed, 0);
        assert_eq!(report.stats.successful, 0);
    }

    #[tokio::test]
    async fn invalid_comments_are_dropped_and_counted() {
        let sleeper = RecordingSleeper::default();
        let mut report = RunReport::start();
        let (outcome, _) = run(
            vec![Ok(vec![comment("valid", false), comment("   ", false), comment("", true)])],
            &mut report,
            &sleeper,
        )
        .await;

        let comments = match outcome {
            RetryOutcome::Extracted(comments) => comments,
            other => panic!("expected Extracted, got {other:?}"),
        };
        assert_eq!(comments.len(), 1);
        assert_eq!(report.stats.invalid_comments, 2);
        assert_eq!(report.stats.total_main_comments, 1);
        assert_eq!(report.stats.total_replies, 0);
    }

    #[tokio::test]
    async fn all_invalid_attempt_is_retried() {
        let sleeper = RecordingSleeper::default();
        let mut report = RunReport::start();
        let (outcome, calls) = run(
            vec![Ok(vec![comment(" ", false)]), Ok(vec![comment("second try", false)])],
            &mut report,
            &sleeper,
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::Extracted(_)));
        assert_eq!(calls, 2);
        assert_eq!(report.stats.invalid_comments, 1);
        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(30)]);
    }

    #[test]
    fn policy_never_allows_zero_attempts() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::default().backoff_after(2), Duration::from_secs(60));
    }
}
