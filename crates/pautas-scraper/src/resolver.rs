//! URL classification and cleanup for post links.

use std::time::Duration;

use pautas_core::Platform;
use reqwest::Client;

use crate::error::ScraperError;

const FACEBOOK_DOMAINS: &[&str] = &["facebook.com", "fb.com", "fb.me", "fb.watch"];
const INSTAGRAM_DOMAINS: &[&str] = &["instagram.com", "instagr.am"];
const TIKTOK_DOMAINS: &[&str] = &["tiktok.com"];

/// Hosts that only redirect to the real post.
const SHORT_LINK_HOSTS: &[&str] = &[
    "fb.me",
    "fb.watch",
    "vt.tiktok.com",
    "vm.tiktok.com",
    "instagr.am",
];

/// Bare network homepages that show up in hand-edited URL lists.
const PLACEHOLDER_URLS: &[&str] = &[
    "https://www.facebook.com/",
    "https://www.facebook.com",
    "https://facebook.com/",
    "https://facebook.com",
    "https://www.instagram.com/",
    "https://www.instagram.com",
    "https://instagram.com/",
    "https://instagram.com",
    "https://www.tiktok.com/",
    "https://www.tiktok.com",
    "https://tiktok.com/",
    "https://tiktok.com",
];

const MIN_URL_LEN: usize = 30;

const EXPAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Classifies `url` by domain substring. Facebook is checked first, then
/// Instagram, then TikTok.
#[must_use]
pub fn resolve(url: &str) -> Option<Platform> {
    let lowered = url.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    let matches = |domains: &[&str]| domains.iter().any(|d| lowered.contains(d));

    if matches(FACEBOOK_DOMAINS) {
        Some(Platform::Facebook)
    } else if matches(INSTAGRAM_DOMAINS) {
        Some(Platform::Instagram)
    } else if matches(TIKTOK_DOMAINS) {
        Some(Platform::TikTok)
    } else {
        None
    }
}

/// Drops everything from the first `?`.
#[must_use]
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    trimmed
        .split_once('?')
        .map_or(trimmed, |(base, _)| base)
        .to_owned()
}

/// Rejects empty input, bare homepages, and anything too short to be a post link.
#[must_use]
pub fn is_valid(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() || PLACEHOLDER_URLS.contains(&trimmed) {
        return false;
    }
    trimmed.chars().count() >= MIN_URL_LEN
}

fn is_short_link(url: &str) -> bool {
    reqwest::Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .is_some_and(|host| SHORT_LINK_HOSTS.contains(&host.as_str()))
}

/// Follows short-link redirects to the post they point at.
pub struct UrlExpander {
    client: Client,
}

impl UrlExpander {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(EXPAND_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Expands known short links with a single HEAD request. Any other URL,
    /// and any failure, yields `url` unchanged.
    pub async fn expand(&self, url: &str) -> String {
        if !is_short_link(url) {
            return url.to_owned();
        }
        match self.resolve_redirect(url).await {
            Ok(expanded) => {
                tracing::info!(%url, %expanded, "short link expanded");
                expanded
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "short link expansion failed; keeping original");
                url.to_owned()
            }
        }
    }

    pub(crate) async fn resolve_redirect(&self, url: &str) -> Result<String, ScraperError> {
        let response = self.client.head(url).send().await?;
        Ok(response.url().to_string())
    }
}
