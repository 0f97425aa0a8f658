//! Liveness prober for subscription URLs

use crate::subscription::models::ProbeOutcome;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Hard limit for a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(6);

/// Default user agent for probe requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for the liveness prober
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Timeout for each probe
    pub timeout: Duration,
    /// User agent for probe requests
    pub user_agent: String,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProberConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// A raw reachability check against a URL
#[async_trait]
pub trait ReachabilityCheck: Send + Sync {
    async fn reach(&self, url: &str) -> Result<()>;
}

/// Header-only HTTP check.
///
/// Any HTTP response counts, whatever its status code: the server answered,
/// which is all a liveness probe can tell about a file it cannot introspect.
pub struct HttpReachability {
    client: Client,
}

impl HttpReachability {
    pub fn new(config: &ProberConfig) -> Result<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReachabilityCheck for HttpReachability {
    async fn reach(&self, url: &str) -> Result<()> {
        let response = self.client.head(url).send().await?;
        debug!(url, status = %response.status(), "probe response");
        Ok(())
    }
}

/// Measures liveness and latency of subscription URLs
#[derive(Clone)]
pub struct LivenessProber {
    config: ProberConfig,
    check: Arc<dyn ReachabilityCheck>,
}

impl LivenessProber {
    /// Create a new HTTP prober with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ProberConfig::default())
    }

    /// Create a new HTTP prober with custom configuration
    pub fn with_config(config: ProberConfig) -> Result<Self> {
        let check = HttpReachability::new(&config)?;
        Ok(Self::with_check(config, Arc::new(check)))
    }

    /// Create a prober around any reachability check
    pub fn with_check(config: ProberConfig, check: Arc<dyn ReachabilityCheck>) -> Self {
        Self { config, check }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Probe a single URL. Never fails: errors and timeouts become `Expired`.
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();

        match tokio::time::timeout(self.config.timeout, self.check.reach(url)).await {
            Ok(Ok(())) => ProbeOutcome::active(start.elapsed().as_millis() as u64),
            Ok(Err(e)) => {
                debug!(url, error = %e, "probe failed");
                ProbeOutcome::expired()
            }
            Err(_) => {
                debug!(url, timeout_ms = self.config.timeout.as_millis() as u64, "probe timed out");
                ProbeOutcome::expired()
            }
        }
    }
}
