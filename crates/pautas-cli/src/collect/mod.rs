//! The `collect` command: extract every configured URL, merge with the
//! stored dataset, and write the result back in one transaction.
//!
//! Per-URL failures never abort the run; they end up as placeholders and in
//! the failed-URL list. Configuration and store errors are fatal.

mod orchestrator;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pautas_core::{load_campaign, load_settings, load_urls, AppConfig, RunReport};
use pautas_db::{merge, MergeOutcome, PostRegistry};
use pautas_scraper::{ApifyClient, TokioSleeper, UrlExpander};

use orchestrator::Orchestrator;

/// Runs one extraction pass over the configured URL list.
///
/// With `dry_run` the merged dataset is summarized but not written. With
/// `only_first` only the first valid URL is processed, regardless of
/// `solo_first_post` in `settings.json`.
///
/// # Errors
///
/// Returns an error if any configuration file is missing or malformed, the
/// store cannot be opened or read, the HTTP clients cannot be built, or the
/// final save fails. In the last case the store is left as it was.
pub(crate) async fn run_collect(
    config: &AppConfig,
    dry_run: bool,
    only_first: bool,
) -> anyhow::Result<()> {
    let mut settings = load_settings(&config.settings_path())?;
    if only_first {
        settings.solo_first_post = true;
    }
    let campaign = Arc::new(load_campaign(&config.campaign_path())?);
    let urls = load_urls(&config.urls_path())?;
    if urls.is_empty() {
        println!(
            "no urls configured in {}; nothing to do",
            config.urls_path().display()
        );
        return Ok(());
    }

    let store_path = PathBuf::from(&settings.output_filename);
    let pool = pautas_db::connect_store(&store_path)
        .await
        .with_context(|| format!("failed to open store {}", store_path.display()))?;
    let existing = pautas_db::load_dataset(&pool)
        .await
        .context("failed to load stored dataset")?;
    let mut registry = PostRegistry::from_dataset(&existing);
    tracing::info!(
        posts = registry.len(),
        rows = existing.rows.len(),
        store = %store_path.display(),
        "loaded existing dataset"
    );

    let client = ApifyClient::new(
        &config.apify_token,
        config.request_timeout_secs,
        &config.user_agent,
    )?
    .with_poll_interval(Duration::from_secs(config.poll_interval_secs));
    let expander = UrlExpander::new(&config.user_agent)?;

    let orchestrator = Orchestrator::new(
        &client,
        &TokioSleeper,
        &expander,
        &settings,
        Duration::from_secs(config.max_wait_secs),
        campaign,
    );
    let batch = orchestrator.run(&urls, &mut registry).await;

    let outcome = merge(existing, batch.rows, &mut registry);

    if dry_run {
        println!("dry-run: store not written");
    } else {
        pautas_db::save_dataset(&pool, &outcome.dataset, &batch.report)
            .await
            .with_context(|| format!("failed to save store {}", store_path.display()))?;
    }

    print_summary(&outcome, &batch.report);
    Ok(())
}

fn print_summary(outcome: &MergeOutcome, report: &RunReport) {
    let dataset = &outcome.dataset;
    let stats = &report.stats;
    let replies = dataset.reply_count();
    let comments = dataset.comment_count();

    tracing::info!(
        posts = dataset.posts.len(),
        comments,
        replies,
        placeholders = dataset.placeholder_count(),
        added = outcome.added,
        duplicates = outcome.duplicates,
        retired = outcome.retired,
        "merge complete"
    );

    println!("posts tracked:      {}", dataset.posts.len());
    println!(
        "comments stored:    {comments} ({} main, {replies} replies)",
        comments - replies
    );
    println!("placeholders:       {}", dataset.placeholder_count());
    println!(
        "this run:           {} new, {} duplicates, {} placeholders retired",
        outcome.added, outcome.duplicates, outcome.retired
    );
    println!(
        "attempts {} | ok {} | failed {} | no comments {} | invalid {} | main {} | replies {}",
        stats.total_attempts,
        stats.successful,
        stats.failed,
        stats.no_comments,
        stats.invalid_comments,
        stats.total_main_comments,
        stats.total_replies
    );

    if !report.failed_urls.is_empty() {
        tracing::warn!(count = report.failed_urls.len(), "urls failed every attempt");
        println!("failed urls:");
        for url in &report.failed_urls {
            println!("  {url}");
        }
    }
}
