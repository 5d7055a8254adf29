// src/utils/env.rs - Environment-driven engine configuration
use log::info;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_MAX_PAGES_PER_PERIOD, DEFAULT_MIN_CALL_INTERVAL_MS,
    DEFAULT_PAGE_SIZE, DEFAULT_SUBSTRING_BUDGET,
};

pub fn load_env() {
    dotenv::dotenv().ok();
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Process-scoped engine configuration, read once at startup and
/// passed down as an injected dependency so tests can substitute
/// fixture values.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Substring-fallback comparison cap per resolution pass.
    pub substring_budget: usize,
    pub live_base_url: String,
    pub live_api_key: Option<String>,
    pub min_call_interval: Duration,
    pub call_timeout: Duration,
    pub max_pages_per_period: u32,
    pub page_size: u32,
    pub snapshot_dir: PathBuf,
    /// Base for filed-document deep links.
    pub document_base_url: String,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            substring_budget: env_parse("MATCH_SUBSTRING_BUDGET", DEFAULT_SUBSTRING_BUDGET),
            live_base_url: env::var("LIVE_QUERY_BASE_URL")
                .unwrap_or_else(|_| "https://api.open.fec.gov/v1".to_string()),
            live_api_key: env::var("LIVE_QUERY_API_KEY").ok().filter(|k| !k.is_empty()),
            min_call_interval: Duration::from_millis(env_parse(
                "LIVE_QUERY_MIN_INTERVAL_MS",
                DEFAULT_MIN_CALL_INTERVAL_MS,
            )),
            call_timeout: Duration::from_secs(env_parse(
                "LIVE_QUERY_TIMEOUT_SECS",
                DEFAULT_CALL_TIMEOUT_SECS,
            )),
            max_pages_per_period: env_parse(
                "LIVE_QUERY_MAX_PAGES_PER_PERIOD",
                DEFAULT_MAX_PAGES_PER_PERIOD,
            ),
            page_size: env_parse("LIVE_QUERY_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            snapshot_dir: PathBuf::from(
                env::var("BULK_SNAPSHOT_DIR").unwrap_or_else(|_| "data/snapshots".to_string()),
            ),
            document_base_url: env::var("DOCUMENT_BASE_URL")
                .unwrap_or_else(|_| "https://docquery.fec.gov/cgi-bin/fecimg".to_string()),
        }
    }

    pub fn log_config(&self) {
        info!("⚙️  Engine configuration:");
        info!("   • substring budget: {} comparisons/pass", self.substring_budget);
        info!(
            "   • live pacing: {}ms between calls, {}s per-call timeout",
            self.min_call_interval.as_millis(),
            self.call_timeout.as_secs()
        );
        info!(
            "   • live pagination: {} pages x {} records per period",
            self.max_pages_per_period, self.page_size
        );
        info!("   • bulk snapshots: {}", self.snapshot_dir.display());
        info!(
            "   • live API key: {}",
            if self.live_api_key.is_some() { "present" } else { "absent (demo tier)" }
        );
    }
}
