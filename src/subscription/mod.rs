//! Subscription module for discovering and validating subscription links
//!
//! This module provides functionality for:
//! - Extracting subscription URLs from AI-generated text
//! - Classifying links into Clash / V2Ray format families
//! - Aggregating candidates from a discovery source
//! - Probing links for liveness and latency, one at a time
//! - Merging and persisting the link collection
//! - Exporting usable links

pub mod aggregator;
pub mod classifier;
pub mod export;
pub mod extractor;
pub mod filter;
pub mod models;
pub mod prober;
pub mod store;
pub mod summary;
pub mod validator;

pub use aggregator::{Aggregator, DiscoveryResponse, DiscoverySource, GroundingSource};
pub use classifier::classify;
pub use export::{Export, ExportKind};
pub use extractor::extract_urls;
pub use filter::is_candidate;
pub use models::{
    LinkFilter, LinkStats, LinkStatus, LinkType, ProbeOutcome, SubscriptionLink,
    FAILED_PING_MS, FAST_PING_THRESHOLD_MS, MAX_LINKS,
};
pub use prober::{LivenessProber, ProberConfig, ReachabilityCheck};
pub use store::{merge, LinkStore, MemoryLinkStore, SqliteLinkStore};
pub use summary::{SummaryGenerator, Summarizer};
pub use validator::{ValidationRunner, ValidationSummary};
