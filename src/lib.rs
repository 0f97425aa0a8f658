//! VPN Hub - Subscription Link Aggregator
//!
//! Discovers publicly posted proxy subscription links through an AI search
//! service, classifies and deduplicates them, and probes each one for
//! liveness and latency.

pub mod app;
pub mod gemini;
pub mod subscription;
pub mod tui;

pub use app::{Hub, HubCommand, HubEvent, SyncReport};
pub use subscription::*;

use std::time::Duration;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

const DEFAULT_DATABASE_URL: &str = "sqlite://vpn-hub.db";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_DISCOVERY_MODEL: &str = "gemini-3-pro-preview";
const DEFAULT_SUMMARY_MODEL: &str = "gemini-3-flash-preview";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL holding the persisted link collection
    pub database_url: String,
    /// Credential for the AI service; `None` disables discovery
    pub api_key: Option<String>,
    /// Base URL of the Gemini REST API
    pub gemini_base_url: String,
    /// Model used for grounded link discovery
    pub discovery_model: String,
    /// Model used for the short pool summary
    pub summary_model: String,
    /// Hard timeout for a single liveness probe
    pub probe_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            discovery_model: DEFAULT_DISCOVERY_MODEL.to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            probe_timeout: subscription::prober::DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the environment (and a `.env` file if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let api_key = non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("API_KEY"));
        let probe_timeout = non_empty_env("VPN_HUB_PROBE_TIMEOUT_MS")
            .and_then(|ms| ms.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.probe_timeout);

        Self {
            database_url: non_empty_env("VPN_HUB_DATABASE").unwrap_or(defaults.database_url),
            api_key,
            gemini_base_url: non_empty_env("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            discovery_model: non_empty_env("GEMINI_DISCOVERY_MODEL")
                .unwrap_or(defaults.discovery_model),
            summary_model: non_empty_env("GEMINI_SUMMARY_MODEL").unwrap_or(defaults.summary_model),
            probe_timeout,
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.trim().is_empty()).then_some(key);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Whether the AI collaborators can be reached at all
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert!(!config.has_api_key());
        assert_eq!(config.probe_timeout, Duration::from_secs(6));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_database_url("sqlite::memory:")
            .with_api_key("secret")
            .with_probe_timeout(Duration::from_millis(500));

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.probe_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_blank_api_key_is_missing() {
        let config = Config::new().with_api_key("   ");
        assert!(!config.has_api_key());
    }
}
