//! Sequential per-URL extraction for one run.
//!
//! Each valid URL is expanded, classified, registered, and extracted under
//! the retry controller. Every URL that reaches extraction contributes either
//! comments or exactly one placeholder to the batch handed to the merger.

use std::sync::Arc;
use std::time::Duration;

use pautas_core::{CampaignInfo, DatasetRow, ExtractionStatus, Placeholder, RunReport, Settings};
use pautas_db::PostRegistry;
use pautas_scraper::resolver::{is_valid, normalize, resolve};
use pautas_scraper::{
    CommentExtractor, ExtractionTarget, ExtractorOptions, JobService, RetryController,
    RetryOutcome, RetryPolicy, Sleeper, UrlExpander,
};

/// Everything one run produced, before merging.
#[derive(Debug)]
pub(crate) struct RunBatch {
    pub rows: Vec<DatasetRow>,
    pub report: RunReport,
}

pub(crate) struct Orchestrator<'a, S, Z> {
    service: &'a S,
    sleeper: &'a Z,
    expander: &'a UrlExpander,
    settings: &'a Settings,
    options: ExtractorOptions,
    campaign: Arc<CampaignInfo>,
}

impl<'a, S: JobService, Z: Sleeper> Orchestrator<'a, S, Z> {
    pub(crate) fn new(
        service: &'a S,
        sleeper: &'a Z,
        expander: &'a UrlExpander,
        settings: &'a Settings,
        max_wait: Duration,
        campaign: Arc<CampaignInfo>,
    ) -> Self {
        Self {
            service,
            sleeper,
            expander,
            settings,
            options: ExtractorOptions {
                max_wait,
                max_replies_per_comment: settings.max_replies_per_comment,
            },
            campaign,
        }
    }

    /// Extracts every URL in order. Per-URL failures become placeholders;
    /// nothing here aborts the run.
    pub(crate) async fn run(&self, urls: &[String], registry: &mut PostRegistry) -> RunBatch {
        let mut report = RunReport::start();
        let mut rows = Vec::new();

        let valid: Vec<&str> = urls
            .iter()
            .map(String::as_str)
            .filter(|url| {
                let ok = is_valid(url);
                if !ok {
                    tracing::warn!(%url, "skipping invalid url");
                }
                ok
            })
            .collect();
        tracing::info!(urls = valid.len(), skipped = urls.len() - valid.len(), "starting extraction run");

        for (index, url) in valid.iter().enumerate() {
            if !self.process_url(url, registry, &mut report, &mut rows).await {
                continue;
            }

            if self.settings.solo_first_post {
                tracing::info!(%url, "solo_first_post set; stopping after first url");
                break;
            }
            if index + 1 < valid.len() {
                let pause = self.pause();
                tracing::info!(pause_secs = pause.as_secs_f64(), "pausing before next url");
                self.sleeper.sleep(pause).await;
            }
        }

        report.finish();
        RunBatch { rows, report }
    }

    /// Returns `false` when the URL never reached extraction.
    async fn process_url(
        &self,
        url: &str,
        registry: &mut PostRegistry,
        report: &mut RunReport,
        rows: &mut Vec<DatasetRow>,
    ) -> bool {
        let expanded = self.expander.expand(url).await;
        let Some(platform) = resolve(&expanded) else {
            tracing::warn!(%url, "unsupported platform; skipping");
            return false;
        };

        let post = registry.register(&normalize(&expanded), url, platform);
        tracing::info!(%url, %platform, post_number = post.post_number, "processing post");

        let target = ExtractionTarget {
            post,
            source_url: expanded,
            target_count: self.settings.max_comments_per_post,
        };
        let extractor = CommentExtractor::new(
            self.service,
            self.sleeper,
            self.options,
            Arc::clone(&self.campaign),
        );
        let retry = RetryController::new(RetryPolicy::new(self.settings.max_retries), self.sleeper);

        report.stats.total_attempts += 1;
        let outcome = retry
            .execute(url, report, || extractor.extract(&target))
            .await;

        match outcome {
            RetryOutcome::Extracted(comments) => {
                rows.extend(comments.into_iter().map(DatasetRow::Comment));
            }
            RetryOutcome::NoComments => {
                report.stats.no_comments += 1;
                rows.push(self.placeholder(&target, ExtractionStatus::NoComments));
            }
            RetryOutcome::Exhausted => {
                rows.push(self.placeholder(&target, ExtractionStatus::Failed));
            }
        }
        true
    }

    fn placeholder(&self, target: &ExtractionTarget, status: ExtractionStatus) -> DatasetRow {
        DatasetRow::Placeholder(Placeholder::for_post(
            &target.post,
            status,
            Arc::clone(&self.campaign),
        ))
    }

    /// Uniform in `[pause_between_urls_min, pause_between_urls_max]`.
    fn pause(&self) -> Duration {
        let (min, max) = self.settings.pause_bounds();
        min + max.saturating_sub(min).mul_f64(rand::random::<f64>())
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
