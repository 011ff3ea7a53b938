//! Dataset model shared by the scraper, the store, and the CLI.
//!
//! A dataset is a list of [`DatasetRow`]s: real [`Comment`]s plus synthetic
//! [`Placeholder`]s marking posts that produced no usable comments in a run.
//! Every row belongs to exactly one [`Post`], identified by its canonical URL.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{comment_fingerprint, placeholder_fingerprint};

/// Social network a post belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    Instagram,
    TikTok,
}

impl Platform {
    /// Display name as persisted in the store (`"Facebook"`, `"Instagram"`, `"TikTok"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
        }
    }

    /// Lowercase key used in fingerprints.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    /// Case-insensitive, so rows written by older tooling (`"facebook"`) load.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::TikTok),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Why a post is represented by a placeholder instead of comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionStatus {
    /// The job succeeded but returned nothing usable.
    NoComments,
    /// Every retry failed.
    Failed,
}

impl ExtractionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionStatus::NoComments => "NO_COMMENTS",
            ExtractionStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NO_COMMENTS" => Ok(ExtractionStatus::NoComments),
            "FAILED" => Ok(ExtractionStatus::Failed),
            other => Err(format!("unknown extraction status '{other}'")),
        }
    }
}

/// Campaign metadata attached to every row of a run.
///
/// `campaign_name` is the only key the pipeline reads; any other keys from
/// `campaign_info.json` are carried through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignInfo {
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// A tracked post ("pauta").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Normalized URL; unique key of the registry.
    pub canonical_url: String,
    /// URL as it appeared in the input list.
    pub original_url: String,
    pub platform: Platform,
    /// Assigned once, never reassigned.
    pub post_number: u32,
    pub first_seen_at: DateTime<Utc>,
}

/// One comment or reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub platform: Platform,
    pub post_url: String,
    pub post_url_original: String,
    pub post_number: u32,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub text: String,
    /// Source-reported creation time, kept as seen (epoch seconds or a date string).
    pub created_time: Option<String>,
    pub likes_count: u64,
    pub replies_count: u64,
    pub is_reply: bool,
    pub parent_comment_id: Option<String>,
    /// Bounded JSON rendering of the raw item, for debugging.
    pub raw_source: Option<String>,
    pub campaign: Arc<CampaignInfo>,
}

impl Comment {
    #[must_use]
    pub fn fingerprint(&self) -> String {
        comment_fingerprint(
            self.platform,
            &self.post_url,
            &self.text,
            self.created_time.as_deref(),
        )
    }
}

/// A post with zero usable comments in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub platform: Platform,
    pub post_url: String,
    pub post_url_original: String,
    pub post_number: u32,
    pub status: ExtractionStatus,
    pub campaign: Arc<CampaignInfo>,
}

impl Placeholder {
    #[must_use]
    pub fn for_post(post: &Post, status: ExtractionStatus, campaign: Arc<CampaignInfo>) -> Self {
        Self {
            platform: post.platform,
            post_url: post.canonical_url.clone(),
            post_url_original: post.original_url.clone(),
            post_number: post.post_number,
            status,
            campaign,
        }
    }

    #[must_use]
    pub fn fingerprint(&self) -> String {
        placeholder_fingerprint(self.platform, self.status, &self.post_url)
    }
}

/// One row of the primary partition.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetRow {
    Comment(Comment),
    Placeholder(Placeholder),
}

impl DatasetRow {
    #[must_use]
    pub fn fingerprint(&self) -> String {
        match self {
            DatasetRow::Comment(c) => c.fingerprint(),
            DatasetRow::Placeholder(p) => p.fingerprint(),
        }
    }

    #[must_use]
    pub fn post_url(&self) -> &str {
        match self {
            DatasetRow::Comment(c) => &c.post_url,
            DatasetRow::Placeholder(p) => &p.post_url,
        }
    }

    #[must_use]
    pub fn post_number(&self) -> u32 {
        match self {
            DatasetRow::Comment(c) => c.post_number,
            DatasetRow::Placeholder(p) => p.post_number,
        }
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            DatasetRow::Comment(c) => c.platform,
            DatasetRow::Placeholder(p) => p.platform,
        }
    }

    #[must_use]
    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            DatasetRow::Comment(c) => Some(c),
            DatasetRow::Placeholder(_) => None,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, DatasetRow::Placeholder(_))
    }
}

impl From<Comment> for DatasetRow {
    fn from(comment: Comment) -> Self {
        DatasetRow::Comment(comment)
    }
}

impl From<Placeholder> for DatasetRow {
    fn from(placeholder: Placeholder) -> Self {
        DatasetRow::Placeholder(placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_parses_case_insensitively() {
        assert_eq!("facebook".parse::<Platform>().unwrap(), Platform::Facebook);
        assert_eq!(" TikTok ".parse::<Platform>().unwrap(), Platform::TikTok);
        assert_eq!("INSTAGRAM".parse::<Platform>().unwrap(), Platform::Instagram);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn platform_display_matches_store_names() {
        assert_eq!(Platform::TikTok.to_string(), "TikTok");
        assert_eq!(Platform::TikTok.key(), "tiktok");
    }

    #[test]
    fn extraction_status_round_trips_through_str() {
        for status in [ExtractionStatus::NoComments, ExtractionStatus::Failed] {
            assert_eq!(status.as_str().parse::<ExtractionStatus>().unwrap(), status);
        }
    }

    #[test]
    fn campaign_info_keeps_unknown_keys() {
        let info: CampaignInfo =
            serde_json::from_str(r#"{"campaign_name":"Verano","client":"Acme","year":2025}"#)
                .unwrap();
        assert_eq!(info.campaign_name.as_deref(), Some("Verano"));
        assert_eq!(info.attributes["client"], "Acme");
        assert_eq!(info.attributes["year"], 2025);
    }

    #[test]
    fn placeholder_and_comment_fingerprints_never_collide() {
        let campaign = Arc::new(CampaignInfo::default());
        let url = "https://www.instagram.com/p/ABC123xyz/";
        let placeholder = Placeholder {
            platform: Platform::Instagram,
            post_url: url.to_owned(),
            post_url_original: url.to_owned(),
            post_number: 1,
            status: ExtractionStatus::NoComments,
            campaign: Arc::clone(&campaign),
        };
        let comment = Comment {
            platform: Platform::Instagram,
            post_url: url.to_owned(),
            post_url_original: url.to_owned(),
            post_number: 1,
            author_name: None,
            author_url: None,
            text: "NO_COMMENTS".to_owned(),
            created_time: None,
            likes_count: 0,
            replies_count: 0,
            is_reply: false,
            parent_comment_id: None,
            raw_source: None,
            campaign,
        };
        assert_ne!(placeholder.fingerprint(), comment.fingerprint());
    }
}
