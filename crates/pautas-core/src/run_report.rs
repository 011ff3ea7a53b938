//! Per-run extraction statistics. Created fresh each run and never merged.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// URLs handed to the retry controller.
    pub total_attempts: u32,
    pub successful: u32,
    pub failed: u32,
    pub no_comments: u32,
    pub invalid_comments: u32,
    pub total_main_comments: u32,
    pub total_replies: u32,
}

/// Statistics plus the URLs that exhausted every retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats: RunStats,
    pub failed_urls: Vec<String>,
}

impl RunReport {
    #[must_use]
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            stats: RunStats::default(),
            failed_urls: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Records a URL as failed. A URL is listed at most once.
    pub fn record_failure(&mut self, url: &str) {
        self.stats.failed += 1;
        if !self.failed_urls.iter().any(|u| u == url) {
            self.failed_urls.push(url.to_owned());
        }
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::start()
    }
}
