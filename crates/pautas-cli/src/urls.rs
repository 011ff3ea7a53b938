//! The `urls` command: show how each configured URL would be treated.

use pautas_core::{load_urls, AppConfig, Platform};
use pautas_scraper::resolver::{is_valid, normalize, resolve};

/// How one line of `urls.txt` classifies, without touching the network.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum UrlCheck {
    Invalid,
    Unsupported,
    Supported { platform: Platform, canonical: String },
}

pub(crate) fn check_url(url: &str) -> UrlCheck {
    if !is_valid(url) {
        return UrlCheck::Invalid;
    }
    match resolve(url) {
        Some(platform) => UrlCheck::Supported {
            platform,
            canonical: normalize(url),
        },
        None => UrlCheck::Unsupported,
    }
}

/// # Errors
///
/// Returns an error if `urls.txt` cannot be read.
pub(crate) fn run_urls(config: &AppConfig) -> anyhow::Result<()> {
    let urls = load_urls(&config.urls_path())?;
    if urls.is_empty() {
        println!("no urls configured in {}", config.urls_path().display());
        return Ok(());
    }

    for (index, url) in urls.iter().enumerate() {
        let line = index + 1;
        match check_url(url) {
            UrlCheck::Supported {
                platform,
                canonical,
            } => println!("{line:>3}  {:<11}  {canonical}", platform.as_str()),
            UrlCheck::Unsupported => println!("{line:>3}  unsupported  {url}"),
            UrlCheck::Invalid => println!("{line:>3}  invalid      {url}"),
        }
    }
    Ok(())
}
