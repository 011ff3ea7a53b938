//! Run inputs read from the config directory: `settings.json`,
//! `campaign_info.json`, and the `urls.txt` allow-list.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::comments::CampaignInfo;
use crate::ConfigError;

/// Longest accepted pause between URLs: one hour.
const MAX_PAUSE_SECS: f64 = 3_600.0;

/// Extraction settings. Every key is optional in `settings.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Total extraction attempts per URL.
    pub max_retries: u32,
    pub max_replies_per_comment: u32,
    pub max_comments_per_post: u32,
    /// Lower bound of the randomized pause between URLs, in seconds.
    pub pause_between_urls_min: f64,
    /// Upper bound of the randomized pause between URLs, in seconds.
    pub pause_between_urls_max: f64,
    /// Process only the first valid URL.
    #[serde(alias = "solo_primer_post")]
    pub solo_first_post: bool,
    /// Path of the SQLite store.
    pub output_filename: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_replies_per_comment: 100,
            max_comments_per_post: 4000,
            pause_between_urls_min: 30.0,
            pause_between_urls_max: 60.0,
            solo_first_post: false,
            output_filename: "comentarios_campana.db".to_string(),
        }
    }
}

impl Settings {
    #[must_use]
    pub fn pause_bounds(&self) -> (Duration, Duration) {
        (
            pause_duration(self.pause_between_urls_min),
            pause_duration(self.pause_between_urls_max),
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.max_comments_per_post == 0 {
            return Err(ConfigError::Validation(
                "max_comments_per_post must be at least 1".to_string(),
            ));
        }
        let bounds_valid = self.pause_between_urls_min.is_finite()
            && self.pause_between_urls_max.is_finite()
            && self.pause_between_urls_min >= 0.0
            && self.pause_between_urls_min <= self.pause_between_urls_max
            && self.pause_between_urls_max <= MAX_PAUSE_SECS;
        if !bounds_valid {
            return Err(ConfigError::Validation(format!(
                "pause bounds must satisfy 0 <= pause_between_urls_min ({}) <= pause_between_urls_max ({}) <= {MAX_PAUSE_SECS}",
                self.pause_between_urls_min, self.pause_between_urls_max
            )));
        }
        if self.output_filename.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_filename must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Out-of-range values saturate instead of panicking; `validate` rejects them
/// for loaded settings.
fn pause_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.min(MAX_PAUSE_SECS)).unwrap_or(Duration::ZERO)
}

/// Load and validate `settings.json`.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = read_file(path)?;
    parse_settings(&content, path)
}

fn parse_settings(content: &str, path: &Path) -> Result<Settings, ConfigError> {
    let settings: Settings =
        serde_json::from_str(content).map_err(|e| ConfigError::FileParse {
            path: path.display().to_string(),
            source: e,
        })?;
    settings.validate()?;
    Ok(settings)
}

/// Load `campaign_info.json`.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or is not a JSON object.
pub fn load_campaign(path: &Path) -> Result<CampaignInfo, ConfigError> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|e| ConfigError::FileParse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the URL allow-list, skipping blank lines and `#` comments.
///
/// # Errors
///
/// Returns `ConfigError::FileIo` if the file cannot be read.
pub fn load_urls(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = read_file(path)?;
    Ok(parse_urls(&content))
}

fn parse_urls(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_path() -> &'static Path {
        Path::new("config/settings.json")
    }

    #[test]
    fn empty_object_yields_defaults() {
        let settings = parse_settings("{}", settings_path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.max_comments_per_post, 4000);
    }

    #[test]
    fn reads_known_keys_and_ignores_unknown_ones() {
        let json = r#"{
            "max_retries": 5,
            "max_replies_per_comment": 20,
            "max_comments_per_post": 6000,
            "pause_between_urls_min": 10,
            "pause_between_urls_max": 12.5,
            "solo_first_post": true,
            "output_filename": "campaign.db",
            "report_theme": "dark"
        }"#;
        let settings = parse_settings(json, settings_path()).unwrap();
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.max_replies_per_comment, 20);
        assert_eq!(settings.max_comments_per_post, 6000);
        assert!(settings.solo_first_post);
        assert_eq!(settings.output_filename, "campaign.db");
        let (min, max) = settings.pause_bounds();
        assert_eq!(min, Duration::from_secs(10));
        assert_eq!(max, Duration::from_millis(12_500));
    }

    #[test]
    fn accepts_legacy_solo_primer_post_key() {
        let settings = parse_settings(r#"{"solo_primer_post": true}"#, settings_path()).unwrap();
        assert!(settings.solo_first_post);
    }

    #[test]
    fn rejects_inverted_pause_bounds() {
        let json = r#"{"pause_between_urls_min": 90, "pause_between_urls_max": 60}"#;
        let err = parse_settings(json, settings_path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "got: {err:?}");
    }

    #[test]
    fn rejects_pause_longer_than_an_hour() {
        let json = r#"{"pause_between_urls_min": 30, "pause_between_urls_max": 1e300}"#;
        let err = parse_settings(json, settings_path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "got: {err:?}");

        let json = r#"{"pause_between_urls_min": 3600, "pause_between_urls_max": 3600}"#;
        assert!(parse_settings(json, settings_path()).is_ok());
    }

    #[test]
    fn pause_bounds_saturate_for_unvalidated_values() {
        let settings = Settings {
            pause_between_urls_min: f64::NAN,
            pause_between_urls_max: 1e300,
            ..Settings::default()
        };
        let (min, max) = settings.pause_bounds();
        assert!(min <= max);
        assert_eq!(max, Duration::from_secs(3_600));
    }

    #[test]
    fn rejects_zero_retries() {
        let err = parse_settings(r#"{"max_retries": 0}"#, settings_path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_settings("{max_retries: 3", settings_path()).unwrap_err();
        assert!(
            matches!(err, ConfigError::FileParse { ref path, .. } if path.ends_with("settings.json"))
        );
    }

    #[test]
    fn url_list_skips_blank_lines_and_comments() {
        let content = "\n# campaign A\nhttps://www.instagram.com/p/ABC123xyz/\n   \n  https://www.tiktok.com/@brand/video/1  \n#https://skipped\n";
        assert_eq!(
            parse_urls(content),
            vec![
                "https://www.instagram.com/p/ABC123xyz/".to_string(),
                "https://www.tiktok.com/@brand/video/1".to_string(),
            ]
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_urls(Path::new("/nonexistent/pautas/urls.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::FileIo { .. }));
    }
}
