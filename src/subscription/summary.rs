//! Short natural-language summary of the link pool

use crate::subscription::models::{SubscriptionLink, FAST_PING_THRESHOLD_MS};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Returned when no AI credential is configured
pub const OFFLINE_SUMMARY: &str = "Local test: sync pipeline healthy.";
/// Returned when the service answers with no text
pub const EMPTY_SUMMARY: &str = "Data updated, node quality looks good.";
/// Returned when the service call fails
pub const FALLBACK_SUMMARY: &str = "Automatic node inspection complete.";

/// External service producing a short text from a prompt
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<String>;
}

/// Prompt describing the pool to the summarizer
pub fn summary_prompt(total: usize, fast: usize) -> String {
    format!(
        "Analysis result: the node pool currently holds {total} links, {fast} of them fast. \
         Give a professional assessment in under 20 words."
    )
}

/// Produces pool summaries, falling back to canned sentences
#[derive(Clone, Default)]
pub struct SummaryGenerator {
    source: Option<Arc<dyn Summarizer>>,
}

impl SummaryGenerator {
    pub fn new(source: Arc<dyn Summarizer>) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn disabled() -> Self {
        Self { source: None }
    }

    pub async fn summarize(&self, links: &[SubscriptionLink]) -> String {
        let Some(source) = &self.source else {
            return OFFLINE_SUMMARY.to_string();
        };

        let fast = links
            .iter()
            .filter(|l| l.ping.is_some_and(|p| p < FAST_PING_THRESHOLD_MS))
            .count();

        match source.summarize(&summary_prompt(links.len(), fast)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => EMPTY_SUMMARY.to_string(),
            Err(e) => {
                warn!(error = %e, "summary generation failed");
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::models::ProbeOutcome;
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct Echo {
        reply: Result<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Echo {
        fn new(reply: Result<String>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Summarizer for Echo {
        async fn summarize(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow!("{e}")),
            }
        }
    }

    fn pool() -> Vec<SubscriptionLink> {
        let mut fast = SubscriptionLink::new("https://a.com/sub", "a");
        fast.apply_probe(&ProbeOutcome::active(90));
        let mut dead = SubscriptionLink::new("https://b.com/sub", "b");
        dead.apply_probe(&ProbeOutcome::expired());
        vec![fast, dead, SubscriptionLink::new("https://c.com/sub", "c")]
    }

    #[tokio::test]
    async fn test_offline_summary() {
        let generator = SummaryGenerator::disabled();
        assert_eq!(generator.summarize(&pool()).await, OFFLINE_SUMMARY);
    }

    #[tokio::test]
    async fn test_summary_prompt_counts() {
        let echo = Arc::new(Echo::new(Ok("  Pool is healthy.  ".to_string())));
        let generator = SummaryGenerator::new(echo.clone());

        assert_eq!(generator.summarize(&pool()).await, "Pool is healthy.");
        let prompts = echo.prompts.lock().unwrap();
        assert_eq!(prompts[0], summary_prompt(3, 1));
    }

    #[tokio::test]
    async fn test_summary_fallbacks() {
        let empty = SummaryGenerator::new(Arc::new(Echo::new(Ok(String::new()))));
        assert_eq!(empty.summarize(&pool()).await, EMPTY_SUMMARY);

        let failing = SummaryGenerator::new(Arc::new(Echo::new(Err(anyhow!("quota")))));
        assert_eq!(failing.summarize(&pool()).await, FALLBACK_SUMMARY);
    }
}
