use crate::app_config::AppConfig;
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a numeric env var holds an invalid value.
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
/// Returns `ConfigError` if a numeric env var holds an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let log_level = or_default("CATSNAP_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("CATSNAP_SOURCES_PATH", "./config/sources.yaml"));
    let output_dir = PathBuf::from(or_default("CATSNAP_OUTPUT_DIR", "./snapshots"));
    let request_timeout_secs = parse_u64("CATSNAP_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("CATSNAP_USER_AGENT", DEFAULT_USER_AGENT);
    let max_attempts = parse_u32("CATSNAP_MAX_ATTEMPTS", "3")?;
    let retry_delay_ms = parse_u64("CATSNAP_RETRY_DELAY_MS", "5000")?;
    let politeness_delay_ms = parse_u64("CATSNAP_POLITENESS_DELAY_MS", "1000")?;

    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "CATSNAP_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        log_level,
        sources_path,
        output_dir,
        request_timeout_secs,
        user_agent,
        max_attempts,
        retry_delay_ms,
        politeness_delay_ms,
    })
}
