use crate::app_config::AppConfig;
use crate::ConfigError;

/// Longest accepted `PAUTAS_MAX_WAIT_SECS`: one day.
const MAX_WAIT_LIMIT_SECS: u64 = 86_400;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let apify_token = require("APIFY_TOKEN")?;
    let log_level = or_default("PAUTAS_LOG_LEVEL", "info");
    let config_dir = PathBuf::from(or_default("PAUTAS_CONFIG_DIR", "./config"));
    let request_timeout_secs = parse_u64("PAUTAS_REQUEST_TIMEOUT_SECS", "60")?;
    let user_agent = or_default("PAUTAS_USER_AGENT", "pautas/0.1 (comment-extraction)");
    let poll_interval_secs = parse_u64("PAUTAS_POLL_INTERVAL_SECS", "10")?;
    let max_wait_secs = parse_u64("PAUTAS_MAX_WAIT_SECS", "600")?;

    if max_wait_secs == 0 || max_wait_secs > MAX_WAIT_LIMIT_SECS {
        return Err(ConfigError::InvalidEnvVar {
            var: "PAUTAS_MAX_WAIT_SECS".to_string(),
            reason: format!("must be between 1 and {MAX_WAIT_LIMIT_SECS}"),
        });
    }

    Ok(AppConfig {
        apify_token,
        log_level,
        config_dir,
        request_timeout_secs,
        user_agent,
        poll_interval_secs,
        max_wait_secs,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
