use thiserror::Error;

use crate::job::JobOutcome;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("job finished with status {outcome}")]
    JobUnsuccessful { outcome: JobOutcome },

    #[error("invalid job service base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
