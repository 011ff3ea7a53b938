//! Whole-store load and save. One read at the start of a run, one
//! transactional write at the end.

use std::sync::Arc;

use chrono::Utc;
use pautas_core::{CampaignInfo, DatasetRow, ExtractionStatus, RunReport};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::merge::Dataset;
use crate::rows::{CampaignCache, CommentRecord, DerivedTime, PostRecord};
use crate::summary::{platform_stats, summarize_posts};
use crate::DbError;

const FAILED_ALL_ATTEMPTS: &str = "FAILED_ALL_ATTEMPTS";

/// Loads the post registry and the primary partition in stored order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::InvalidRow`] for
/// rows that cannot be mapped back to the model.
pub async fn load_dataset(pool: &SqlitePool) -> Result<Dataset, DbError> {
    let posts = sqlx::query_as::<_, PostRecord>(
        "SELECT post_number, canonical_url, original_url, platform, first_seen_at \
         FROM posts ORDER BY post_number",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(PostRecord::into_post)
    .collect::<Result<Vec<_>, _>>()?;

    let records = sqlx::query_as::<_, CommentRecord>(
        "SELECT position, fingerprint, post_number, platform, post_url, post_url_original, \
                author_name, author_url, comment_text, created_time, likes_count, \
                replies_count, is_reply, parent_comment_id, extraction_status, raw_source, \
                campaign_json \
         FROM comments ORDER BY position",
    )
    .fetch_all(pool)
    .await?;

    let mut campaigns = CampaignCache::default();
    let rows = records
        .into_iter()
        .map(|r| r.into_row(&mut campaigns))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(posts = posts.len(), rows = rows.len(), "store loaded");
    Ok(Dataset { posts, rows })
}

/// Replaces the store's contents with `dataset` and regenerates every
/// secondary table from it plus `report`.
///
/// Runs in a single transaction: on any error nothing is written.
///
/// # Errors
///
/// Returns [`DbError`] if serialization or any statement fails.
pub async fn save_dataset(
    pool: &SqlitePool,
    dataset: &Dataset,
    report: &RunReport,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    for table in [
        "comments",
        "posts",
        "post_summary",
        "platform_stats",
        "failed_urls",
        "run_stats",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }

    insert_posts(&mut tx, dataset).await?;
    insert_rows(&mut tx, dataset).await?;
    insert_summaries(&mut tx, dataset).await?;
    insert_run(&mut tx, report).await?;

    tx.commit().await?;
    tracing::info!(rows = dataset.rows.len(), posts = dataset.posts.len(), "store saved");
    Ok(())
}

async fn insert_posts(tx: &mut Transaction<'_, Sqlite>, dataset: &Dataset) -> Result<(), DbError> {
    for post in &dataset.posts {
        sqlx::query(
            "INSERT INTO posts (post_number, canonical_url, original_url, platform, first_seen_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(i64::from(post.post_number))
        .bind(&post.canonical_url)
        .bind(&post.original_url)
        .bind(post.platform.as_str())
        .bind(post.first_seen_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_rows(tx: &mut Transaction<'_, Sqlite>, dataset: &Dataset) -> Result<(), DbError> {
    let mut campaign_json: Vec<(Arc<CampaignInfo>, String)> = Vec::new();

    for (position, row) in (1_i64..).zip(&dataset.rows) {
        let campaign = match row {
            DatasetRow::Comment(c) => &c.campaign,
            DatasetRow::Placeholder(p) => &p.campaign,
        };
        let json = match campaign_json.iter().find(|(known, _)| Arc::ptr_eq(known, campaign)) {
            Some((_, json)) => json.clone(),
            None => {
                let json = serde_json::to_string(campaign.as_ref())?;
                campaign_json.push((Arc::clone(campaign), json.clone()));
                json
            }
        };

        let query = sqlx::query(
            "INSERT INTO comments (position, fingerprint, post_number, platform, post_url, \
                 post_url_original, author_name, author_url, comment_text, created_time, \
                 processed_timestamp, comment_date, comment_time, likes_count, replies_count, \
                 is_reply, parent_comment_id, extraction_status, raw_source, campaign_json) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(position)
        .bind(row.fingerprint())
        .bind(i64::from(row.post_number()))
        .bind(row.platform().as_str())
        .bind(row.post_url());

        let query = match row {
            DatasetRow::Comment(c) => {
                let derived = DerivedTime::from_created_time(c.created_time.as_deref());
                query
                    .bind(&c.post_url_original)
                    .bind(&c.author_name)
                    .bind(&c.author_url)
                    .bind(&c.text)
                    .bind(&c.created_time)
                    .bind(derived.processed_timestamp)
                    .bind(derived.comment_date)
                    .bind(derived.comment_time)
                    .bind(to_i64(c.likes_count))
                    .bind(to_i64(c.replies_count))
                    .bind(c.is_reply)
                    .bind(&c.parent_comment_id)
                    .bind(None::<String>)
                    .bind(&c.raw_source)
            }
            DatasetRow::Placeholder(p) => query
                .bind(&p.post_url_original)
                .bind(None::<String>)
                .bind(None::<String>)
                .bind(None::<String>)
                .bind(None::<String>)
                .bind(None::<String>)
                .bind(None::<String>)
                .bind(None::<String>)
                .bind(0_i64)
                .bind(0_i64)
                .bind(false)
                .bind(None::<String>)
                .bind(p.status.as_str())
                .bind(None::<String>),
        };

        query.bind(json).execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_summaries(
    tx: &mut Transaction<'_, Sqlite>,
    dataset: &Dataset,
) -> Result<(), DbError> {
    for summary in summarize_posts(dataset) {
        sqlx::query(
            "INSERT INTO post_summary (post_number, platform, post_url, post_url_original, \
                 status, comments, replies, likes, first_comment_at, last_comment_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(i64::from(summary.post_number))
        .bind(summary.platform.as_str())
        .bind(&summary.post_url)
        .bind(&summary.post_url_original)
        .bind(summary.status.map(ExtractionStatus::as_str))
        .bind(to_i64(summary.comments))
        .bind(to_i64(summary.replies))
        .bind(to_i64(summary.likes))
        .bind(summary.first_comment_at)
        .bind(summary.last_comment_at)
        .execute(&mut **tx)
        .await?;
    }

    for stats in platform_stats(dataset) {
        sqlx::query(
            "INSERT INTO platform_stats (platform, posts_with_comments, comments, replies, \
                 avg_likes, total_likes) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(stats.platform.as_str())
        .bind(to_i64(stats.posts_with_comments))
        .bind(to_i64(stats.comments))
        .bind(to_i64(stats.replies))
        .bind(stats.avg_likes)
        .bind(to_i64(stats.total_likes))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_run(tx: &mut Transaction<'_, Sqlite>, report: &RunReport) -> Result<(), DbError> {
    let run_id = report.run_id.to_string();
    let recorded_at = report.finished_at.unwrap_or_else(Utc::now);

    for url in &report.failed_urls {
        sqlx::query("INSERT INTO failed_urls (url, status, run_id, recorded_at) VALUES (?, ?, ?, ?)")
            .bind(url)
            .bind(FAILED_ALL_ATTEMPTS)
            .bind(&run_id)
            .bind(recorded_at)
            .execute(&mut **tx)
            .await?;
    }

    let stats = &report.stats;
    sqlx::query(
        "INSERT INTO run_stats (run_id, started_at, finished_at, total_attempts, successful, \
             failed, no_comments, invalid_comments, total_main_comments, total_replies) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&run_id)
    .bind(report.started_at)
    .bind(report.finished_at)
    .bind(i64::from(stats.total_attempts))
    .bind(i64::from(stats.successful))
    .bind(i64::from(stats.failed))
    .bind(i64::from(stats.no_comments))
    .bind(i64::from(stats.invalid_comments))
    .bind(i64::from(stats.total_main_comments))
    .bind(i64::from(stats.total_replies))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
