//! Secondary partitions derived from the primary one.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use pautas_core::{DatasetRow, ExtractionStatus, Platform};

use crate::merge::{processed_timestamp, Dataset};

#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub post_number: u32,
    pub platform: Platform,
    pub post_url: String,
    pub post_url_original: String,
    /// Set when the post is represented by a placeholder.
    pub status: Option<ExtractionStatus>,
    pub comments: u64,
    pub replies: u64,
    pub likes: u64,
    pub first_comment_at: Option<DateTime<Utc>>,
    pub last_comment_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformStats {
    pub platform: Platform,
    pub posts_with_comments: u64,
    pub comments: u64,
    pub replies: u64,
    /// Mean likes per comment, rounded to two decimals.
    pub avg_likes: f64,
    pub total_likes: u64,
}

/// One summary per registered post, by post number.
#[must_use]
pub fn summarize_posts(dataset: &Dataset) -> Vec<PostSummary> {
    let mut by_number: BTreeMap<u32, PostSummary> = dataset
        .posts
        .iter()
        .map(|post| {
            (
                post.post_number,
                PostSummary {
                    post_number: post.post_number,
                    platform: post.platform,
                    post_url: post.canonical_url.clone(),
                    post_url_original: post.original_url.clone(),
                    status: None,
                    comments: 0,
                    replies: 0,
                    likes: 0,
                    first_comment_at: None,
                    last_comment_at: None,
                },
            )
        })
        .collect();

    for row in &dataset.rows {
        let Some(summary) = by_number.get_mut(&row.post_number()) else {
            continue;
        };
        match row {
            DatasetRow::Placeholder(p) => summary.status = Some(p.status),
            DatasetRow::Comment(c) => {
                summary.comments += 1;
                if c.is_reply {
                    summary.replies += 1;
                }
                summary.likes += c.likes_count;
                if let Some(ts) = processed_timestamp(row) {
                    summary.first_comment_at = Some(summary.first_comment_at.map_or(ts, |t| t.min(ts)));
                    summary.last_comment_at = Some(summary.last_comment_at.map_or(ts, |t| t.max(ts)));
                }
            }
        }
    }

    by_number.into_values().collect()
}

/// Aggregates per platform that has at least one row.
#[must_use]
pub fn platform_stats(dataset: &Dataset) -> Vec<PlatformStats> {
    let mut acc: BTreeMap<Platform, (BTreeSet<u32>, u64, u64, u64)> = BTreeMap::new();

    for row in &dataset.rows {
        let entry = acc.entry(row.platform()).or_default();
        if let DatasetRow::Comment(c) = row {
            entry.0.insert(c.post_number);
            entry.1 += 1;
            if c.is_reply {
                entry.2 += 1;
            }
            entry.3 += c.likes_count;
        }
    }

    acc.into_iter()
        .map(|(platform, (posts, comments, replies, total_likes))| PlatformStats {
            platform,
            posts_with_comments: u64::try_from(posts.len()).unwrap_or(u64::MAX),
            comments,
            replies,
            avg_likes: average(total_likes, comments),
            total_likes,
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn average(total: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let mean = total as f64 / count as f64;
    (mean * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pautas_core::{CampaignInfo, Comment, Placeholder, Post};

    use super::*;

    fn post(number: u32, platform: Platform, url: &str) -> Post {
        Post {
            canonical_url: url.to_owned(),
            original_url: url.to_owned(),
            platform,
            post_number: number,
            first_seen_at: Utc::now(),
        }
    }

    fn comment(post: &Post, likes: u64, is_reply: bool, time: &str) -> DatasetRow {
        DatasetRow::Comment(Comment {
            platform: post.platform,
            post_url: post.canonical_url.clone(),
            post_url_original: post.original_url.clone(),
            post_number: post.post_number,
            author_name: None,
            author_url: None,
            text: format!("{likes} likes"),
            created_time: Some(time.to_owned()),
            likes_count: likes,
            replies_count: 0,
            is_reply,
            parent_comment_id: None,
            raw_source: None,
            campaign: Arc::new(CampaignInfo::default()),
        })
    }

    fn dataset() -> Dataset {
        let ig = post(1, Platform::Instagram, "https://www.instagram.com/p/ABC123xyz/");
        let tt = post(2, Platform::TikTok, "https://www.tiktok.com/@brand/video/1234567");
        let ig2 = post(3, Platform::Instagram, "https://www.instagram.com/p/DEF456uvw/");
        let rows = vec![
            comment(&ig, 3, false, "1700000000"),
            comment(&ig, 0, true, "1700000600"),
            comment(&ig2, 4, false, "1700001000"),
            DatasetRow::Placeholder(Placeholder::for_post(
                &tt,
                ExtractionStatus::NoComments,
                Arc::new(CampaignInfo::default()),
            )),
        ];
        Dataset {
            posts: vec![ig, tt, ig2],
            rows,
        }
    }

    #[test]
    fn post_summary_counts_comments_and_bounds_times() {
        let summaries = summarize_posts(&dataset());
        assert_eq!(summaries.len(), 3);

        let first = &summaries[0];
        assert_eq!(first.comments, 2);
        assert_eq!(first.replies, 1);
        assert_eq!(first.likes, 3);
        assert_eq!(first.first_comment_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(first.last_comment_at.unwrap().timestamp(), 1_700_000_600);
        assert_eq!(first.status, None);

        let second = &summaries[1];
        assert_eq!(second.comments, 0);
        assert_eq!(second.status, Some(ExtractionStatus::NoComments));
    }

    #[test]
    fn platform_stats_average_likes_to_two_decimals() {
        let stats = platform_stats(&dataset());
        assert_eq!(stats.len(), 2);

        let ig = stats.iter().find(|s| s.platform == Platform::Instagram).unwrap();
        assert_eq!(ig.posts_with_comments, 2);
        assert_eq!(ig.comments, 3);
        assert_eq!(ig.replies, 1);
        assert_eq!(ig.total_likes, 7);
        assert!((ig.avg_likes - 2.33).abs() < f64::EPSILON);

        let tt = stats.iter().find(|s| s.platform == Platform::TikTok).unwrap();
        assert_eq!(tt.comments, 0);
        assert_eq!(tt.posts_with_comments, 0);
        assert!(tt.avg_likes.abs() < f64::EPSILON);
    }
}
