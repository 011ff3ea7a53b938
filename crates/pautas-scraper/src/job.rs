//! Job-service contract: what a run request looks like per platform, how a
//! submitted run is identified, and the terminal states it can reach.

use std::future::Future;
use std::time::Duration;

use pautas_core::Platform;
use serde::Serialize;

use crate::error::ScraperError;

pub const FACEBOOK_ACTOR: &str = "apify/facebook-comments-scraper";
pub const INSTAGRAM_ACTOR: &str = "apify/instagram-scraper";
pub const TIKTOK_ACTOR: &str = "clockworks/tiktok-comments-scraper";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacebookInput {
    pub start_urls: Vec<StartUrl>,
    pub max_comments: u32,
    pub max_post_comments: u32,
    pub comments_mode: &'static str,
    pub scrape_replies: bool,
    pub max_replies: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramInput {
    pub direct_urls: Vec<String>,
    pub results_type: &'static str,
    pub results_limit: u32,
    pub add_parent_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TikTokInput {
    #[serde(rename = "postURLs")]
    pub post_urls: Vec<String>,
    pub max_comments_per_post: u32,
    pub comments_per_post: u32,
    pub max_replies_per_comment: u32,
}

/// Actor input body. Serializes as the bare platform object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobInput {
    Facebook(FacebookInput),
    Instagram(InstagramInput),
    TikTok(TikTokInput),
}

/// One run to start on the job service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub actor: &'static str,
    pub input: JobInput,
}

impl JobRequest {
    /// Builds the fixed per-platform request for `max_comments` comments of
    /// `url`, with at most `max_replies` replies per comment where the
    /// platform supports a reply cap.
    #[must_use]
    pub fn for_platform(platform: Platform, url: &str, max_comments: u32, max_replies: u32) -> Self {
        match platform {
            Platform::Facebook => Self {
                actor: FACEBOOK_ACTOR,
                input: JobInput::Facebook(FacebookInput {
                    start_urls: vec![StartUrl {
                        url: url.to_owned(),
                    }],
                    max_comments,
                    max_post_comments: max_comments,
                    comments_mode: "RANKED_UNFILTERED",
                    scrape_replies: true,
                    max_replies,
                }),
            },
            Platform::Instagram => Self {
                actor: INSTAGRAM_ACTOR,
                input: JobInput::Instagram(InstagramInput {
                    direct_urls: vec![url.to_owned()],
                    results_type: "comments",
                    results_limit: max_comments,
                    add_parent_data: false,
                }),
            },
            Platform::TikTok => Self {
                actor: TIKTOK_ACTOR,
                input: JobInput::TikTok(TikTokInput {
                    post_urls: vec![url.to_owned()],
                    max_comments_per_post: max_comments,
                    comments_per_post: max_comments,
                    max_replies_per_comment: max_replies,
                }),
            },
        }
    }
}

/// Identifies a started run and the dataset it writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub run_id: String,
    pub dataset_id: String,
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl JobOutcome {
    /// Maps a job-service run status to a terminal outcome.
    ///
    /// Returns `None` for states that must keep being polled, including the
    /// transitional `TIMING-OUT` and `ABORTING` and any status not recognized.
    #[must_use]
    pub fn from_status(status: &str) -> Option<Self> {
        match status {
            "SUCCEEDED" => Some(JobOutcome::Succeeded),
            "FAILED" => Some(JobOutcome::Failed),
            "TIMED-OUT" => Some(JobOutcome::TimedOut),
            "ABORTED" => Some(JobOutcome::Aborted),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobOutcome::Succeeded => "SUCCEEDED",
            JobOutcome::Failed => "FAILED",
            JobOutcome::TimedOut => "TIMED-OUT",
            JobOutcome::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

/// An asynchronous scraping service that runs one job per request.
pub trait JobService {
    /// Starts a run.
    fn submit(
        &self,
        request: &JobRequest,
    ) -> impl Future<Output = Result<JobHandle, ScraperError>> + Send;

    /// Polls until the run reaches a terminal state. Returns
    /// [`JobOutcome::TimedOut`] once `max_wait` has elapsed.
    fn await_completion(
        &self,
        handle: &JobHandle,
        max_wait: Duration,
    ) -> impl Future<Output = Result<JobOutcome, ScraperError>> + Send;

    /// Every item the run produced.
    fn fetch_items(
        &self,
        handle: &JobHandle,
    ) -> impl Future<Output = Result<Vec<serde_json::Value>, ScraperError>> + Send;
}
