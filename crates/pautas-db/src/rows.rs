//! Row types for the `posts` and `comments` tables and their mapping to the
//! dataset model.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pautas_core::{
    parse_created_time, CampaignInfo, Comment, DatasetRow, ExtractionStatus, Placeholder,
    Platform, Post,
};

use crate::DbError;

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRecord {
    pub post_number: i64,
    pub canonical_url: String,
    pub original_url: String,
    pub platform: String,
    pub first_seen_at: DateTime<Utc>,
}

impl PostRecord {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] for an unknown platform or an
    /// out-of-range post number.
    pub fn into_post(self) -> Result<Post, DbError> {
        let invalid = |reason: String| DbError::InvalidRow {
            table: "posts",
            key: self.canonical_url.clone(),
            reason,
        };
        let platform = self.platform.parse::<Platform>().map_err(invalid)?;
        let post_number = u32::try_from(self.post_number)
            .map_err(|_| invalid(format!("post_number {} out of range", self.post_number)))?;
        Ok(Post {
            canonical_url: self.canonical_url,
            original_url: self.original_url,
            platform,
            post_number,
            first_seen_at: self.first_seen_at,
        })
    }
}

/// A row from the `comments` table. Placeholders carry `extraction_status`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRecord {
    pub position: i64,
    pub fingerprint: String,
    pub post_number: i64,
    pub platform: String,
    pub post_url: String,
    pub post_url_original: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub comment_text: Option<String>,
    pub created_time: Option<String>,
    pub likes_count: i64,
    pub replies_count: i64,
    pub is_reply: bool,
    pub parent_comment_id: Option<String>,
    pub extraction_status: Option<String>,
    pub raw_source: Option<String>,
    pub campaign_json: Option<String>,
}

/// Shares one `Arc<CampaignInfo>` per distinct stored campaign.
#[derive(Default)]
pub(crate) struct CampaignCache {
    by_json: HashMap<String, Arc<CampaignInfo>>,
}

impl CampaignCache {
    fn resolve(&mut self, json: Option<&str>) -> Arc<CampaignInfo> {
        let key = json.unwrap_or_default();
        if let Some(info) = self.by_json.get(key) {
            return Arc::clone(info);
        }
        let info = if key.trim().is_empty() {
            CampaignInfo::default()
        } else {
            serde_json::from_str(key).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "unreadable campaign metadata; using empty");
                CampaignInfo::default()
            })
        };
        let info = Arc::new(info);
        self.by_json.insert(key.to_owned(), Arc::clone(&info));
        info
    }
}

impl CommentRecord {
    /// Maps a stored row back to the dataset model.
    ///
    /// Older stores wrote lowercase platform names, left `post_url_original`
    /// empty, and marked "no comments" rows only by blank text; all of those
    /// load.
    pub(crate) fn into_row(self, campaigns: &mut CampaignCache) -> Result<DatasetRow, DbError> {
        let invalid = |reason: String| DbError::InvalidRow {
            table: "comments",
            key: self.position.to_string(),
            reason,
        };
        let platform = self.platform.parse::<Platform>().map_err(invalid)?;
        let post_number = u32::try_from(self.post_number)
            .map_err(|_| invalid(format!("post_number {} out of range", self.post_number)))?;
        let status = self
            .extraction_status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<ExtractionStatus>)
            .transpose()
            .map_err(invalid)?;

        let text = self.comment_text.unwrap_or_default();
        let post_url_original = self
            .post_url_original
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.post_url.clone());
        let campaign = campaigns.resolve(self.campaign_json.as_deref());

        let status = match status {
            Some(status) => Some(status),
            None if text.trim().is_empty() => Some(ExtractionStatus::NoComments),
            None => None,
        };

        if let Some(status) = status {
            return Ok(DatasetRow::Placeholder(Placeholder {
                platform,
                post_url: self.post_url,
                post_url_original,
                post_number,
                status,
                campaign,
            }));
        }

        Ok(DatasetRow::Comment(Comment {
            platform,
            post_url: self.post_url,
            post_url_original,
            post_number,
            author_name: self.author_name,
            author_url: self.author_url,
            text,
            created_time: self.created_time,
            likes_count: u64::try_from(self.likes_count).unwrap_or(0),
            replies_count: u64::try_from(self.replies_count).unwrap_or(0),
            is_reply: self.is_reply,
            parent_comment_id: self.parent_comment_id,
            raw_source: self.raw_source,
            campaign,
        }))
    }
}

/// Columns derived from a comment's creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedTime {
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub processed_timestamp: Option<String>,
    pub comment_date: Option<String>,
    pub comment_time: Option<String>,
}

impl DerivedTime {
    #[must_use]
    pub fn from_created_time(created_time: Option<&str>) -> Self {
        let Some(ts) = created_time.and_then(parse_created_time) else {
            return Self::default();
        };
        let naive = ts.naive_utc();
        Self {
            processed_timestamp: Some(naive.format("%Y-%m-%d %H:%M:%S").to_string()),
            comment_date: Some(naive.format("%Y-%m-%d").to_string()),
            comment_time: Some(naive.format("%H:%M:%S").to_string()),
        }
    }
}
