//! Reconciliation of a freshly extracted batch with the persisted dataset.
//!
//! Rows are identified only by fingerprint. Comments are never updated in
//! place, placeholders are retired as soon as their post gains a real
//! comment, and post numbers come from a registry that only ever grows.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use pautas_core::{parse_created_time, DatasetRow, Platform, Post};

/// Everything the store holds that the merger reads and writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub posts: Vec<Post>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_placeholder()).count()
    }

    #[must_use]
    pub fn reply_count(&self) -> usize {
        self.rows
            .iter()
            .filter_map(DatasetRow::as_comment)
            .filter(|c| c.is_reply)
            .count()
    }

    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_placeholder()).count()
    }
}

/// Canonical URL to post, numbered `1..` in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct PostRegistry {
    by_url: BTreeMap<String, Post>,
    next_number: u32,
}

impl PostRegistry {
    /// Seeds the registry from a loaded dataset. Rows whose URL has no post
    /// entry (older stores) register under the number they already carry.
    #[must_use]
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut registry = Self {
            by_url: BTreeMap::new(),
            next_number: 1,
        };
        for post in &dataset.posts {
            registry.insert(post.clone());
        }
        for row in &dataset.rows {
            if registry.by_url.contains_key(row.post_url()) {
                continue;
            }
            let original = match row {
                DatasetRow::Comment(c) => &c.post_url_original,
                DatasetRow::Placeholder(p) => &p.post_url_original,
            };
            registry.insert(Post {
                canonical_url: row.post_url().to_owned(),
                original_url: original.clone(),
                platform: row.platform(),
                post_number: row.post_number(),
                first_seen_at: Utc::now(),
            });
        }
        registry
    }

    fn insert(&mut self, post: Post) {
        self.next_number = self.next_number.max(post.post_number.saturating_add(1));
        self.by_url.insert(post.canonical_url.clone(), post);
    }

    /// Returns the post for `canonical_url`, registering it with the next
    /// free number if it is new. Existing numbers never change.
    pub fn register(&mut self, canonical_url: &str, original_url: &str, platform: Platform) -> Post {
        if let Some(post) = self.by_url.get(canonical_url) {
            return post.clone();
        }
        let post = Post {
            canonical_url: canonical_url.to_owned(),
            original_url: original_url.to_owned(),
            platform,
            post_number: self.next_number,
            first_seen_at: Utc::now(),
        };
        tracing::info!(url = %canonical_url, post_number = post.post_number, "registered new post");
        self.insert(post.clone());
        post
    }

    #[must_use]
    pub fn get(&self, canonical_url: &str) -> Option<&Post> {
        self.by_url.get(canonical_url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }

    /// All posts by ascending number.
    #[must_use]
    pub fn posts(&self) -> Vec<Post> {
        let mut posts: Vec<Post> = self.by_url.values().cloned().collect();
        posts.sort_by_key(|p| p.post_number);
        posts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub dataset: Dataset,
    /// Batch rows appended.
    pub added: usize,
    /// Batch rows skipped: already stored, repeated in the batch, or a
    /// placeholder for a post that has real comments.
    pub duplicates: usize,
    /// Stored placeholders removed.
    pub retired: usize,
}

/// Unions `batch` into `existing`.
///
/// Every batch row is stamped with its registry post number before it is
/// compared, so post numbers in the result always agree with the registry.
#[must_use]
pub fn merge(existing: Dataset, batch: Vec<DatasetRow>, registry: &mut PostRegistry) -> MergeOutcome {
    let mut rows = existing.rows;
    let mut seen: HashSet<String> = rows.iter().map(DatasetRow::fingerprint).collect();

    let mut new_comments: Vec<DatasetRow> = Vec::new();
    let mut new_placeholders: Vec<DatasetRow> = Vec::new();
    let mut duplicates = 0usize;

    for mut row in batch {
        stamp_post_number(&mut row, registry);
        if !seen.insert(row.fingerprint()) {
            duplicates += 1;
            continue;
        }
        if row.is_placeholder() {
            new_placeholders.push(row);
        } else {
            new_comments.push(row);
        }
    }

    let gained: HashSet<String> = new_comments.iter().map(|r| r.post_url().to_owned()).collect();
    let before = rows.len();
    rows.retain(|r| !(r.is_placeholder() && gained.contains(r.post_url())));
    let mut retired = before - rows.len();

    let mut with_comments: HashSet<String> = rows
        .iter()
        .filter(|r| !r.is_placeholder())
        .map(|r| r.post_url().to_owned())
        .collect();
    with_comments.extend(gained);

    let mut added = new_comments.len();
    rows.extend(new_comments);

    for placeholder in new_placeholders {
        let url = placeholder.post_url().to_owned();
        if with_comments.contains(&url) {
            duplicates += 1;
            continue;
        }
        let before = rows.len();
        rows.retain(|r| !(r.is_placeholder() && r.post_url() == url));
        retired += before - rows.len();
        rows.push(placeholder);
        added += 1;
    }

    sort_rows(&mut rows);

    tracing::info!(added, duplicates, retired, total = rows.len(), "merge complete");

    MergeOutcome {
        dataset: Dataset {
            posts: registry.posts(),
            rows,
        },
        added,
        duplicates,
        retired,
    }
}

fn stamp_post_number(row: &mut DatasetRow, registry: &mut PostRegistry) {
    let (url, original, platform) = match row {
        DatasetRow::Comment(c) => (&c.post_url, &c.post_url_original, c.platform),
        DatasetRow::Placeholder(p) => (&p.post_url, &p.post_url_original, p.platform),
    };
    let number = registry.register(url, original, platform).post_number;
    match row {
        DatasetRow::Comment(c) => c.post_number = number,
        DatasetRow::Placeholder(p) => p.post_number = number,
    }
}

/// Processed timestamp of a row: the parsed comment time, if any.
#[must_use]
pub fn processed_timestamp(row: &DatasetRow) -> Option<DateTime<Utc>> {
    row.as_comment()
        .and_then(|c| c.created_time.as_deref())
        .and_then(parse_created_time)
}

/// Post number ascending, then newest first, rows without a timestamp last.
pub fn sort_rows(rows: &mut [DatasetRow]) {
    rows.sort_by_cached_key(|row| {
        let ts = processed_timestamp(row);
        (row.post_number(), ts.is_none(), Reverse(ts))
    });
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
