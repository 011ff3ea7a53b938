pub mod app_config;
pub mod comments;
pub mod config;
pub mod identity;
pub mod run_report;
pub mod settings;
pub mod timestamps;

pub use app_config::AppConfig;
pub use comments::{
    CampaignInfo, Comment, DatasetRow, ExtractionStatus, Placeholder, Platform, Post,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use identity::{comment_fingerprint, placeholder_fingerprint, UNKNOWN_TIMESTAMP};
pub use run_report::{RunReport, RunStats};
pub use settings::{load_campaign, load_settings, load_urls, Settings};
pub use timestamps::{normalize_timestamp_key, parse_created_time};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Validation(String),
}
