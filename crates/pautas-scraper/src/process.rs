//! Flattens raw job-service items into [`Comment`] records.
//!
//! Items can nest replies (`replies` arrays) and, for Instagram, whole posts
//! can wrap a `comments` array. Both are walked with an explicit stack; each
//! emitted record carries `is_reply` and the parent comment id.

use std::borrow::Cow;
use std::sync::Arc;

use pautas_core::{CampaignInfo, Comment, Platform, Post};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

const RAW_SOURCE_MAX_CHARS: usize = 500;

const FACEBOOK_TIME_FIELDS: &[&str] = &[
    "createdTime",
    "timestamp",
    "publishedTime",
    "date",
    "createdAt",
    "publishedAt",
];

const INSTAGRAM_TIME_FIELDS: &[&str] = &[
    "timestamp",
    "createdTime",
    "publishedAt",
    "date",
    "createdAt",
    "taken_at",
];

/// HTML-entity decode, NFC-normalize, and trim.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let decoded: Cow<'_, str> = html_escape::decode_html_entities(raw);
    decoded.nfc().collect::<String>().trim().to_owned()
}

/// Maps raw items for one post into comments.
pub struct ItemProcessor<'a> {
    post: &'a Post,
    campaign: &'a Arc<CampaignInfo>,
}

impl<'a> ItemProcessor<'a> {
    #[must_use]
    pub fn new(post: &'a Post, campaign: &'a Arc<CampaignInfo>) -> Self {
        Self { post, campaign }
    }

    #[must_use]
    pub fn process(&self, items: &[Value]) -> Vec<Comment> {
        let mut comments = Vec::with_capacity(items.len());

        for item in items {
            let mut stack: Vec<(&Value, Option<String>)> = Vec::new();
            match item.get("comments").and_then(Value::as_array) {
                Some(wrapped) if self.post.platform == Platform::Instagram => {
                    stack.extend(wrapped.iter().rev().map(|c| (c, None)));
                }
                _ => stack.push((item, None)),
            }

            while let Some((node, parent)) = stack.pop() {
                if !node.is_object() {
                    continue;
                }
                let comment = self.map_node(node, parent);
                if let Some(replies) = node.get("replies").and_then(Value::as_array) {
                    let own_id = comment_id(node);
                    stack.extend(replies.iter().rev().map(|r| (r, own_id.clone())));
                }
                comments.push(comment);
            }
        }

        comments
    }

    fn map_node(&self, node: &Value, nested_parent: Option<String>) -> Comment {
        let fields = match self.post.platform {
            Platform::Facebook => facebook_fields(node),
            Platform::Instagram => instagram_fields(node),
            Platform::TikTok => tiktok_fields(node),
        };

        let is_reply = fields.parent.is_some() || fields.reply_flag || nested_parent.is_some();
        let parent_comment_id = fields.parent.or(nested_parent);

        Comment {
            platform: self.post.platform,
            post_url: self.post.canonical_url.clone(),
            post_url_original: self.post.original_url.clone(),
            post_number: self.post.post_number,
            author_name: fields.author_name,
            author_url: fields.author_url,
            text: node.get("text").and_then(Value::as_str).map(clean_text).unwrap_or_default(),
            created_time: fields.created_time,
            likes_count: count(node, fields.likes_key),
            replies_count: count(node, fields.replies_key),
            is_reply,
            parent_comment_id,
            raw_source: raw_snapshot(node),
            campaign: Arc::clone(self.campaign),
        }
    }
}

/// Platform-specific pieces of one raw comment.
struct Fields {
    author_name: Option<String>,
    author_url: Option<String>,
    created_time: Option<String>,
    parent: Option<String>,
    /// Set when the source marks a reply without naming its parent.
    reply_flag: bool,
    likes_key: &'static str,
    replies_key: &'static str,
}

fn facebook_fields(node: &Value) -> Fields {
    let parent = ["parentCommentId", "replyToId"]
        .iter()
        .find_map(|k| node.get(*k).and_then(scalar_string));
    Fields {
        author_name: text_field(node, "authorName"),
        author_url: text_field(node, "authorUrl"),
        created_time: first_scalar(node, FACEBOOK_TIME_FIELDS),
        parent,
        reply_flag: false,
        likes_key: "likesCount",
        replies_key: "repliesCount",
    }
}

fn instagram_fields(node: &Value) -> Fields {
    let author_name = text_field(node, "ownerUsername");
    let author_url = author_name
        .as_ref()
        .map(|a| format!("https://instagram.com/{a}"));
    Fields {
        author_name,
        author_url,
        created_time: first_scalar(node, INSTAGRAM_TIME_FIELDS),
        parent: None,
        reply_flag: false,
        likes_key: "likesCount",
        replies_key: "repliesCount",
    }
}

fn tiktok_fields(node: &Value) -> Fields {
    let user = node.get("user");
    let author_url = user
        .and_then(|u| u.get("uniqueId"))
        .and_then(scalar_string)
        .map(|id| format!("https://www.tiktok.com/@{id}"));
    let reply_to = node.get("replyToId");
    Fields {
        author_name: user.and_then(|u| text_field(u, "nickname")),
        author_url,
        created_time: node.get("createTime").and_then(scalar_string),
        parent: reply_to.and_then(scalar_string),
        reply_flag: reply_to.is_some(),
        likes_key: "diggCount",
        replies_key: "replyCommentTotal",
    }
}

fn comment_id(node: &Value) -> Option<String> {
    ["id", "pk", "cid"]
        .iter()
        .find_map(|k| node.get(*k).and_then(scalar_string))
}

/// Non-empty string or any number, as a string.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_scalar(node: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| node.get(*k).and_then(scalar_string))
}

fn text_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

/// Numbers or numeric strings; anything else counts as zero.
fn count(node: &Value, key: &str) -> u64 {
    match node.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(truncate_f64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(truncate_f64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn truncate_f64(value: f64) -> u64 {
    value.trunc() as u64
}

fn raw_snapshot(node: &Value) -> Option<String> {
    serde_json::to_string(node)
        .ok()
        .map(|s| s.chars().take(RAW_SOURCE_MAX_CHARS).collect())
}
