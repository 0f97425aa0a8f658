//! Subscription link data models

use crate::subscription::classifier::classify;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum number of links retained in the collection
pub const MAX_LINKS: usize = 200;

/// Links answering faster than this are considered fast
pub const FAST_PING_THRESHOLD_MS: u64 = 2000;

/// Ping recorded for a probe that failed or timed out
pub const FAILED_PING_MS: u64 = 9999;

/// Title used when a source provides none
pub const DEFAULT_TITLE: &str = "Untitled source";

/// Subscription file format family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LinkType {
    V2Ray,
    Clash,
    #[default]
    #[serde(alias = "未知")]
    Unknown,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::V2Ray => write!(f, "V2Ray"),
            LinkType::Clash => write!(f, "Clash"),
            LinkType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Liveness state of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LinkStatus {
    #[default]
    #[serde(alias = "检测中")]
    Testing,
    #[serde(alias = "有效")]
    Active,
    #[serde(alias = "已失效")]
    Expired,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Testing => write!(f, "testing"),
            LinkStatus::Active => write!(f, "active"),
            LinkStatus::Expired => write!(f, "expired"),
        }
    }
}

/// A discovered subscription link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionLink {
    pub id: String,
    pub url: String,
    pub title: String,
    /// Host component of `url`, or `"unknown"`
    pub source: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub status: LinkStatus,
    /// Last status change (creation, then every applied probe)
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping: Option<u64>,
}

impl SubscriptionLink {
    /// Create a freshly discovered link in the `Testing` state.
    ///
    /// The type is assigned here once and never revised.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let url = url.into();
        let title = title.into();
        let title = if title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title
        };

        Self {
            id: Uuid::new_v4().simple().to_string(),
            link_type: classify(&url),
            source: host_of(&url),
            url,
            title,
            status: LinkStatus::Testing,
            updated_at: Utc::now(),
            ping: None,
        }
    }

    /// Record the result of a liveness probe
    pub fn apply_probe(&mut self, outcome: &ProbeOutcome) {
        self.status = outcome.status;
        self.ping = Some(outcome.ping_ms);
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.status == LinkStatus::Active
    }

    /// Active and answering under the fast threshold
    pub fn is_fast(&self) -> bool {
        self.is_active() && self.ping.is_some_and(|p| p < FAST_PING_THRESHOLD_MS)
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Result of a single liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub status: LinkStatus,
    pub ping_ms: u64,
}

impl ProbeOutcome {
    pub fn active(ping_ms: u64) -> Self {
        Self {
            status: LinkStatus::Active,
            ping_ms,
        }
    }

    pub fn expired() -> Self {
        Self {
            status: LinkStatus::Expired,
            ping_ms: FAILED_PING_MS,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == LinkStatus::Active
    }
}

/// View filter applied to the collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkFilter {
    /// Case-insensitive match against title and source
    pub search: String,
    pub link_type: Option<LinkType>,
    pub only_fast: bool,
}

impl LinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_type(mut self, link_type: Option<LinkType>) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn with_only_fast(mut self, only_fast: bool) -> Self {
        self.only_fast = only_fast;
        self
    }

    /// Cycle the type filter: all -> V2Ray -> Clash -> Unknown -> all
    pub fn next_type(&mut self) {
        self.link_type = match self.link_type {
            None => Some(LinkType::V2Ray),
            Some(LinkType::V2Ray) => Some(LinkType::Clash),
            Some(LinkType::Clash) => Some(LinkType::Unknown),
            Some(LinkType::Unknown) => None,
        };
    }

    pub fn matches(&self, link: &SubscriptionLink) -> bool {
        let haystack = format!("{}{}", link.title, link.source).to_lowercase();
        let matches_search = haystack.contains(&self.search.to_lowercase());
        let matches_type = self.link_type.map_or(true, |t| link.link_type == t);
        let matches_fast = !self.only_fast || link.is_fast();
        matches_search && matches_type && matches_fast
    }
}

/// Aggregate numbers shown above the link list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub total: usize,
    pub active: usize,
    pub fast: usize,
    pub avg_ping_ms: u64,
}

impl LinkStats {
    pub fn from_links(links: &[SubscriptionLink]) -> Self {
        let active: Vec<&SubscriptionLink> = links.iter().filter(|l| l.is_active()).collect();
        let fast = active.iter().filter(|l| l.is_fast()).count();
        let avg_ping_ms = if active.is_empty() {
            0
        } else {
            let sum: u64 = active.iter().map(|l| l.ping.unwrap_or(0)).sum();
            (sum as f64 / active.len() as f64).round() as u64
        };

        Self {
            total: links.len(),
            active: active.len(),
            fast,
            avg_ping_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probed(url: &str, title: &str, outcome: ProbeOutcome) -> SubscriptionLink {
        let mut link = SubscriptionLink::new(url, title);
        link.apply_probe(&outcome);
        link
    }

    #[test]
    fn test_link_creation() {
        let link = SubscriptionLink::new("https://raw.githubusercontent.com/a/b/clash.yaml", "nodes");
        assert_eq!(link.source, "raw.githubusercontent.com");
        assert_eq!(link.link_type, LinkType::Clash);
        assert_eq!(link.status, LinkStatus::Testing);
        assert_eq!(link.title, "nodes");
        assert!(link.ping.is_none());
        assert!(!link.id.is_empty());
    }

    #[test]
    fn test_link_defaults() {
        let link = SubscriptionLink::new("not a url", "");
        assert_eq!(link.source, "unknown");
        assert_eq!(link.title, DEFAULT_TITLE);
        assert_eq!(link.link_type, LinkType::Unknown);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = SubscriptionLink::new("https://example.com/sub", "a");
        let b = SubscriptionLink::new("https://example.com/sub", "a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_apply_probe() {
        let mut link = SubscriptionLink::new("https://example.com/sub.txt", "x");
        let created = link.updated_at;

        link.apply_probe(&ProbeOutcome::active(120));
        assert_eq!(link.status, LinkStatus::Active);
        assert_eq!(link.ping, Some(120));
        assert!(link.updated_at >= created);
        assert!(link.is_fast());

        link.apply_probe(&ProbeOutcome::expired());
        assert_eq!(link.status, LinkStatus::Expired);
        assert_eq!(link.ping, Some(FAILED_PING_MS));
        assert!(!link.is_fast());
    }

    #[test]
    fn test_json_shape() {
        let link = SubscriptionLink::new("https://example.com/v2ray.txt", "x");
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(value["type"], "V2Ray");
        assert_eq!(value["status"], "Testing");
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("ping").is_none());
    }

    #[test]
    fn test_legacy_labels_deserialize() {
        let json = r#"{
            "id": "abc123xyz",
            "url": "https://example.com/x",
            "title": "t",
            "source": "example.com",
            "type": "未知",
            "status": "有效",
            "updatedAt": "2025-03-01T10:00:00.000Z",
            "ping": 340
        }"#;
        let link: SubscriptionLink = serde_json::from_str(json).unwrap();
        assert_eq!(link.link_type, LinkType::Unknown);
        assert_eq!(link.status, LinkStatus::Active);
        assert_eq!(link.ping, Some(340));
    }

    #[test]
    fn test_filter_matches() {
        let fast = probed("https://a.com/clash.yaml", "Fast Clash", ProbeOutcome::active(300));
        let slow = probed("https://b.com/v2ray.txt", "Slow V2", ProbeOutcome::active(2500));
        let dead = probed("https://c.com/sub", "Dead", ProbeOutcome::expired());

        let all = LinkFilter::new();
        assert!(all.matches(&fast) && all.matches(&slow) && all.matches(&dead));

        let only_fast = LinkFilter::new().with_only_fast(true);
        assert!(only_fast.matches(&fast));
        assert!(!only_fast.matches(&slow));
        assert!(!only_fast.matches(&dead));

        let clash = LinkFilter::new().with_type(Some(LinkType::Clash));
        assert!(clash.matches(&fast));
        assert!(!clash.matches(&slow));

        let search = LinkFilter::new().with_search("B.COM");
        assert!(search.matches(&slow));
        assert!(!search.matches(&fast));
    }

    #[test]
    fn test_filter_type_cycle() {
        let mut filter = LinkFilter::new();
        filter.next_type();
        assert_eq!(filter.link_type, Some(LinkType::V2Ray));
        filter.next_type();
        filter.next_type();
        assert_eq!(filter.link_type, Some(LinkType::Unknown));
        filter.next_type();
        assert_eq!(filter.link_type, None);
    }

    #[test]
    fn test_stats() {
        let links = vec![
            probed("https://a.com/sub", "a", ProbeOutcome::active(100)),
            probed("https://b.com/sub", "b", ProbeOutcome::active(2901)),
            probed("https://c.com/sub", "c", ProbeOutcome::expired()),
            SubscriptionLink::new("https://d.com/sub", "d"),
        ];
        let stats = LinkStats::from_links(&links);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.fast, 1);
        assert_eq!(stats.avg_ping_ms, 1501);

        assert_eq!(LinkStats::from_links(&[]), LinkStats::default());
    }
}
