use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub apify_token: String,
    pub log_level: String,
    pub config_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn urls_path(&self) -> PathBuf {
        self.config_dir.join("urls.txt")
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    #[must_use]
    pub fn campaign_path(&self) -> PathBuf {
        self.config_dir.join("campaign_info.json")
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("apify_token", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("config_dir", &self.config_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_wait_secs", &self.max_wait_secs)
            .finish()
    }
}
