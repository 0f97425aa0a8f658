//! Aggregation of subscription links from an AI discovery source
//!
//! The discovery source is untrusted: whatever it returns is run through
//! extraction, filtering and classification, and any failure degrades to an
//! empty batch.

use crate::subscription::extractor::{extract_urls, trim_markdown};
use crate::subscription::filter::is_candidate;
use crate::subscription::models::SubscriptionLink;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Title given to grounding entries that carry none
pub const GROUNDED_TITLE: &str = "Auto-collected source";

/// Instruction sent to the discovery source
pub const DISCOVERY_PROMPT: &str = "\
Search for and list the latest free VPN subscription links that are active this year.
Requirements:
1. Prefer raw file paths inside GitHub repositories, e.g. raw links ending in .yaml, .yml or .txt.
2. Cover both Clash (YAML format) and V2Ray/Trojan/SS (URI list or Base64) subscriptions.
3. Exclude repository home pages; only give concrete subscription file URLs.
4. Format: one URL per line with no extra explanation.

Key sources to search:
- raw.githubusercontent.com/.../clash.yaml
- raw.githubusercontent.com/.../v2ray.txt
- node.freeclashx.com
- other active aggregated subscription feeds.";

/// A citation backing the generated answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub uri: String,
    pub title: Option<String>,
}

impl GroundingSource {
    pub fn new(uri: impl Into<String>, title: Option<String>) -> Self {
        Self {
            uri: uri.into(),
            title,
        }
    }
}

/// Validated answer of a discovery request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResponse {
    /// Free-form generated text
    pub text: String,
    /// Grounding citations, in the order returned
    pub sources: Vec<GroundingSource>,
}

/// External service that finds subscription links
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    async fn discover(&self, prompt: &str) -> Result<DiscoveryResponse>;
}

/// Turn a discovery answer into fresh `Testing` link records.
///
/// Grounding sources come first, then URLs extracted from the text. A URL
/// is kept once, and only when it looks like a subscription file.
pub fn collect_candidates(response: &DiscoveryResponse) -> Vec<SubscriptionLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let grounded = response.sources.iter().map(|source| {
        let title = source
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| GROUNDED_TITLE.to_string());
        (source.uri.clone(), title)
    });
    let extracted = extract_urls(&response.text)
        .into_iter()
        .enumerate()
        .map(|(i, url)| (url, format!("AI extracted node {}", i + 1)));

    for (url, title) in grounded.chain(extracted) {
        let url = trim_markdown(&url);
        if url.is_empty() || seen.contains(url) || !is_candidate(url) {
            continue;
        }
        seen.insert(url.to_string());
        links.push(SubscriptionLink::new(url, title));
    }

    links
}

/// Runs discovery and produces candidate batches
#[derive(Clone, Default)]
pub struct Aggregator {
    source: Option<Arc<dyn DiscoverySource>>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn DiscoverySource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Aggregator without a configured source; every run is a no-op
    pub fn disabled() -> Self {
        Self { source: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Discover a batch of new candidate links.
    ///
    /// Returns an empty batch when no source is configured or the source fails.
    pub async fn aggregate(&self) -> Vec<SubscriptionLink> {
        let Some(source) = &self.source else {
            debug!("discovery disabled, skipping aggregation");
            return Vec::new();
        };

        match source.discover(DISCOVERY_PROMPT).await {
            Ok(response) => {
                let links = collect_candidates(&response);
                info!(
                    grounding = response.sources.len(),
                    text_len = response.text.len(),
                    candidates = links.len(),
                    "aggregation finished"
                );
                links
            }
            Err(e) => {
                error!(error = %e, "aggregation failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::models::{LinkStatus, LinkType};
    use anyhow::anyhow;

    struct StaticSource(DiscoveryResponse);

    #[async_trait]
    impl DiscoverySource for StaticSource {
        async fn discover(&self, prompt: &str) -> Result<DiscoveryResponse> {
            assert!(prompt.contains("subscription"));
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl DiscoverySource for BrokenSource {
        async fn discover(&self, _prompt: &str) -> Result<DiscoveryResponse> {
            Err(anyhow!("malformed response"))
        }
    }

    #[test]
    fn test_collect_grounding_first() {
        let response = DiscoveryResponse {
            text: "Try https://raw.githubusercontent.com/u/r/main/v2ray.txt".to_string(),
            sources: vec![GroundingSource::new(
                "https://raw.githubusercontent.com/u/r/main/clash.yaml",
                Some("clash feed".to_string()),
            )],
        };
        let links = collect_candidates(&response);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "clash feed");
        assert_eq!(links[0].link_type, LinkType::Clash);
        assert_eq!(links[1].title, "AI extracted node 1");
        assert_eq!(links[1].link_type, LinkType::V2Ray);
        assert!(links.iter().all(|l| l.status == LinkStatus::Testing && l.ping.is_none()));
    }

    #[test]
    fn test_collect_dedups_after_trim() {
        let response = DiscoveryResponse {
            text: String::new(),
            sources: vec![
                GroundingSource::new("https://nodesave.com/sub/a.txt`", None),
                GroundingSource::new("https://nodesave.com/sub/a.txt*", Some("again".to_string())),
            ],
        };
        let links = collect_candidates(&response);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://nodesave.com/sub/a.txt");
        assert_eq!(links[0].title, GROUNDED_TITLE);
    }

    #[test]
    fn test_collect_text_duplicates_grounding() {
        let url = "https://raw.githubusercontent.com/u/r/main/sub.yaml";
        let response = DiscoveryResponse {
            text: format!("- `{url}`"),
            sources: vec![GroundingSource::new(url, Some("grounded".to_string()))],
        };
        let links = collect_candidates(&response);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "grounded");
    }

    #[test]
    fn test_collect_filters_pages() {
        let response = DiscoveryResponse {
            text: "https://github.com/user/free-v2ray/tree/main".to_string(),
            sources: vec![
                GroundingSource::new("https://www.google.com/search?q=clash", None),
                GroundingSource::new("https://vertexaisearch.cloud.google.com/grounding-api-redirect/abc", None),
            ],
        };
        assert!(collect_candidates(&response).is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_disabled() {
        let aggregator = Aggregator::disabled();
        assert!(!aggregator.is_enabled());
        assert!(aggregator.aggregate().await.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_failure_is_empty() {
        let aggregator = Aggregator::new(Arc::new(BrokenSource));
        assert!(aggregator.aggregate().await.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_success() {
        let aggregator = Aggregator::new(Arc::new(StaticSource(DiscoveryResponse {
            text: "https://node.freeclashx.com/2025/clash.yaml\nhttps://example.com/sub".to_string(),
            sources: vec![],
        })));
        let links = aggregator.aggregate().await;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, "node.freeclashx.com");
    }
}
