//! Content fingerprints used as row identity for deduplication and merge.
//!
//! A comment is identified by platform, canonical post URL, trimmed text, and
//! normalized creation time. Author fields are left out: the job service has
//! been seen reporting different author data for the same comment across runs.
//!
//! Placeholders hash into a separate namespace (`REGISTRY_` prefix) so they can
//! never collide with a comment fingerprint, which is always bare lowercase hex.

use sha2::{Digest, Sha256};

use crate::comments::{ExtractionStatus, Platform};
use crate::timestamps::normalize_timestamp_key;

/// Timestamp token for comments without a usable creation time.
pub const UNKNOWN_TIMESTAMP: &str = "UNKNOWN";

/// Fingerprint of a real comment.
#[must_use]
pub fn comment_fingerprint(
    platform: Platform,
    post_url: &str,
    text: &str,
    created_time: Option<&str>,
) -> String {
    let key = format!(
        "{}|{}|{}|{}",
        platform.key(),
        post_url.trim(),
        text.trim(),
        normalize_timestamp_key(created_time)
    );
    sha256_hex(&key)
}

/// Fingerprint of a registry placeholder.
#[must_use]
pub fn placeholder_fingerprint(
    platform: Platform,
    status: ExtractionStatus,
    post_url: &str,
) -> String {
    format!(
        "REGISTRY_{}_{}_{}",
        platform.key(),
        status.as_str(),
        sha256_hex(post_url.trim())
    )
}

fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}
