use std::path::PathBuf;
use std::time::Duration;

/// Process-wide settings read from the environment.
///
/// Per-source behaviour (endpoints, strategy tables, noise lists) lives in the
/// sources file at [`AppConfig::sources_path`], not here.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub sources_path: PathBuf,
    /// Directory snapshots are written to, one `<source-slug>.json` per source.
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Total attempts per request, including the first one.
    pub max_attempts: u32,
    /// Base delay for linear backoff: the wait after attempt `n` is `retry_delay_ms * n`.
    pub retry_delay_ms: u64,
    /// Pause between consecutive requests to the same source.
    pub politeness_delay_ms: u64,
}

impl AppConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
