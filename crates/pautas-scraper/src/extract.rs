//! One full (possibly multi-batch) comment extraction for a post.

use std::sync::Arc;
use std::time::Duration;

use pautas_core::{CampaignInfo, Comment, Platform, Post};

use crate::error::ScraperError;
use crate::job::{JobOutcome, JobRequest, JobService};
use crate::pagination::{paginate, BatchPolicy, BatchResult};
use crate::process::ItemProcessor;
use crate::resolver::normalize;
use crate::sleeper::Sleeper;

/// A registered post plus the link to hand to the job service.
#[derive(Debug, Clone)]
pub struct ExtractionTarget {
    pub post: Post,
    /// The URL after short-link expansion, before query stripping.
    pub source_url: String,
    pub target_count: u32,
}

impl ExtractionTarget {
    /// Instagram jobs take the link as given; the other actors get it without tracking parameters.
    #[must_use]
    pub fn job_url(&self) -> String {
        match self.post.platform {
            Platform::Instagram => self.source_url.clone(),
            Platform::Facebook | Platform::TikTok => normalize(&self.source_url),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractorOptions {
    pub max_wait: Duration,
    pub max_replies_per_comment: u32,
}

pub struct CommentExtractor<'a, S, Z> {
    service: &'a S,
    sleeper: &'a Z,
    options: ExtractorOptions,
    campaign: Arc<CampaignInfo>,
}

impl<'a, S: JobService, Z: Sleeper> CommentExtractor<'a, S, Z> {
    #[must_use]
    pub fn new(
        service: &'a S,
        sleeper: &'a Z,
        options: ExtractorOptions,
        campaign: Arc<CampaignInfo>,
    ) -> Self {
        Self {
            service,
            sleeper,
            options,
            campaign,
        }
    }

    /// Extracts up to `target.target_count` deduplicated comments.
    ///
    /// # Errors
    ///
    /// Propagates job-service errors from the first batch, and returns
    /// [`ScraperError::JobUnsuccessful`] if the first job does not succeed.
    pub async fn extract(&self, target: &ExtractionTarget) -> Result<Vec<Comment>, ScraperError> {
        let policy = BatchPolicy::for_platform(target.post.platform);
        let processor = ItemProcessor::new(&target.post, &self.campaign);
        let job_url = target.job_url();

        paginate(policy, target.target_count, self.sleeper, |size| {
            let processor = &processor;
            let job_url = job_url.as_str();
            async move {
                let request = JobRequest::for_platform(
                    target.post.platform,
                    job_url,
                    size,
                    self.options.max_replies_per_comment,
                );
                let handle = self.service.submit(&request).await?;
                let outcome = self
                    .service
                    .await_completion(&handle, self.options.max_wait)
                    .await?;
                if outcome != JobOutcome::Succeeded {
                    tracing::warn!(url = %job_url, run_id = %handle.run_id, %outcome, "job did not succeed");
                    return Ok(BatchResult::Unsuccessful(outcome));
                }
                let items = self.service.fetch_items(&handle).await?;
                Ok(BatchResult::Completed(processor.process(&items)))
            }
        })
        .await
    }
}
