//! Application controller owning the link collection
//!
//! A [`Hub`] is the single writer of the collection. Callers either drive it
//! directly (CLI) or hand it to [`run_worker`], which executes commands one at
//! a time and reports changes as [`HubEvent`]s (TUI).

use crate::gemini::GeminiClient;
use crate::subscription::{
    merge, store::new_links, Aggregator, LinkFilter, LinkStats, LinkStatus, LinkStore,
    LivenessProber, ProberConfig, SqliteLinkStore, SubscriptionLink, SummaryGenerator,
    ValidationRunner, ValidationSummary,
};
use crate::{Config, Result};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

/// Notice shown while discovery is unavailable
pub const MISSING_KEY_NOTICE: &str = "API key not configured, AI discovery is disabled.";

/// Change notifications emitted by a [`Hub`]
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// Current progress text; empty when idle
    Progress(String),
    /// Full collection after a membership change
    Links(Vec<SubscriptionLink>),
    /// A single record after a probe
    LinkUpdated(SubscriptionLink),
    /// One-off message for the user
    Notice(String),
}

/// Requests accepted by [`run_worker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubCommand {
    Sync,
    ValidatePending,
    RevalidateAll,
    Summary,
}

/// Outcome of a sync run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Discovery is not configured; nothing was attempted
    pub disabled: bool,
    /// Candidates returned by aggregation
    pub discovered: usize,
    /// Candidates that were new to the collection
    pub added: usize,
    pub validation: ValidationSummary,
}

/// Application state: collection, collaborators and progress
pub struct Hub {
    links: Vec<SubscriptionLink>,
    loaded_existing: bool,
    store: Arc<dyn LinkStore>,
    aggregator: Aggregator,
    runner: ValidationRunner,
    summaries: SummaryGenerator,
    progress: String,
    events: Option<UnboundedSender<HubEvent>>,
}

impl Hub {
    /// Assemble a hub from its parts. Call [`Hub::load`] before use.
    pub fn new(
        store: Arc<dyn LinkStore>,
        aggregator: Aggregator,
        runner: ValidationRunner,
        summaries: SummaryGenerator,
    ) -> Self {
        Self {
            links: Vec::new(),
            loaded_existing: false,
            store,
            aggregator,
            runner,
            summaries,
            progress: String::new(),
            events: None,
        }
    }

    /// Build a hub from configuration and load the saved collection
    pub async fn open(config: &Config) -> Result<Self> {
        let store = SqliteLinkStore::new(&config.database_url).await?;
        let prober = LivenessProber::with_config(ProberConfig::new().with_timeout(config.probe_timeout))?;

        let (aggregator, summaries) = match GeminiClient::from_config(config) {
            Some(client) => {
                let client = Arc::new(client);
                (Aggregator::new(client.clone()), SummaryGenerator::new(client))
            }
            None => {
                warn!("{}", MISSING_KEY_NOTICE);
                (Aggregator::disabled(), SummaryGenerator::disabled())
            }
        };

        let mut hub = Self::new(
            Arc::new(store),
            aggregator,
            ValidationRunner::new(prober),
            summaries,
        );
        hub.load().await;
        Ok(hub)
    }

    /// Send change notifications to `events`
    pub fn with_events(mut self, events: UnboundedSender<HubEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Read the saved collection once. A broken store starts an empty session.
    pub async fn load(&mut self) {
        match self.store.load().await {
            Ok(Some(links)) => {
                info!(count = links.len(), "loaded saved links");
                self.links = links;
                self.loaded_existing = true;
            }
            Ok(None) => {
                self.links.clear();
                self.loaded_existing = false;
            }
            Err(e) => {
                warn!(error = %e, "failed to load saved links, starting empty");
                self.links.clear();
                self.loaded_existing = false;
            }
        }
        self.emit(HubEvent::Links(self.links.clone()));
    }

    pub fn links(&self) -> &[SubscriptionLink] {
        &self.links
    }

    pub fn progress(&self) -> &str {
        &self.progress
    }

    pub fn discovery_enabled(&self) -> bool {
        self.aggregator.is_enabled()
    }

    pub fn stats(&self) -> LinkStats {
        LinkStats::from_links(&self.links)
    }

    pub fn filtered(&self, filter: &LinkFilter) -> Vec<&SubscriptionLink> {
        self.links.iter().filter(|l| filter.matches(l)).collect()
    }

    /// First run syncs; later runs resume probing of links left in `Testing`.
    pub async fn startup(&mut self) -> Result<()> {
        if !self.discovery_enabled() {
            self.emit(HubEvent::Notice(MISSING_KEY_NOTICE.to_string()));
        }

        if !self.loaded_existing && self.discovery_enabled() {
            self.sync().await?;
        } else {
            self.validate_pending().await;
        }
        Ok(())
    }

    /// Discover new links, merge them in and probe the ones that were new.
    pub async fn sync(&mut self) -> Result<SyncReport> {
        if !self.discovery_enabled() {
            self.emit(HubEvent::Notice(MISSING_KEY_NOTICE.to_string()));
            return Ok(SyncReport {
                disabled: true,
                ..SyncReport::default()
            });
        }

        self.set_progress("Searching with AI...");
        let discovered = self.aggregator.aggregate().await;
        let fresh = new_links(&self.links, &discovered);

        self.links = merge(&self.links, &discovered);
        self.loaded_existing = true;
        self.persist().await;
        self.emit(HubEvent::Links(self.links.clone()));

        info!(discovered = discovered.len(), added = fresh.len(), total = self.links.len(), "sync merged");

        let validation = if fresh.is_empty() {
            self.set_progress("");
            self.emit(HubEvent::Notice("No new links found".to_string()));
            ValidationSummary::default()
        } else {
            self.validate(&fresh).await
        };

        Ok(SyncReport {
            disabled: false,
            discovered: discovered.len(),
            added: fresh.len(),
            validation,
        })
    }

    /// Probe `targets` sequentially, saving after each one
    pub async fn validate(&mut self, targets: &[SubscriptionLink]) -> ValidationSummary {
        if targets.is_empty() {
            return ValidationSummary::default();
        }

        self.set_progress("Measuring latency...");
        let events = self.events.clone();
        let summary = self
            .runner
            .run(&mut self.links, targets, self.store.as_ref(), |link| {
                if let Some(tx) = &events {
                    let _ = tx.send(HubEvent::LinkUpdated(link.clone()));
                }
            })
            .await;
        self.set_progress("");
        summary
    }

    /// Probe every link still waiting for its first result
    pub async fn validate_pending(&mut self) -> ValidationSummary {
        let pending: Vec<SubscriptionLink> = self
            .links
            .iter()
            .filter(|l| l.status == LinkStatus::Testing)
            .cloned()
            .collect();
        self.validate(&pending).await
    }

    /// Probe the whole collection again
    pub async fn revalidate_all(&mut self) -> ValidationSummary {
        let all = self.links.clone();
        self.validate(&all).await
    }

    pub async fn summary(&self) -> String {
        self.summaries.summarize(&self.links).await
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.links).await {
            warn!(error = %e, "failed to persist link collection");
        }
    }

    fn set_progress(&mut self, progress: &str) {
        self.progress = progress.to_string();
        self.emit(HubEvent::Progress(self.progress.clone()));
    }

    fn emit(&self, event: HubEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Run startup, then execute commands until the channel closes.
pub async fn run_worker(mut hub: Hub, mut commands: UnboundedReceiver<HubCommand>) {
    hub.emit(HubEvent::Links(hub.links.clone()));
    if let Err(e) = hub.startup().await {
        warn!(error = %e, "startup failed");
        hub.emit(HubEvent::Notice("Sync failed".to_string()));
    }

    while let Some(command) = commands.recv().await {
        match command {
            HubCommand::Sync => match hub.sync().await {
                Ok(report) if !report.disabled => hub.emit(HubEvent::Notice(format!(
                    "Sync done: {} found, {} new, {} active",
                    report.discovered, report.added, report.validation.active
                ))),
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "sync failed");
                    hub.set_progress("");
                    hub.emit(HubEvent::Notice("Sync failed".to_string()));
                }
            },
            HubCommand::ValidatePending => {
                let summary = hub.validate_pending().await;
                hub.emit(HubEvent::Notice(format!(
                    "Validated {} pending links, {} active",
                    summary.probed, summary.active
                )));
            }
            HubCommand::RevalidateAll => {
                let summary = hub.revalidate_all().await;
                hub.emit(HubEvent::Notice(format!(
                    "Re-validated {} links, {} active",
                    summary.probed, summary.active
                )));
            }
            HubCommand::Summary => {
                let summary = hub.summary().await;
                hub.emit(HubEvent::Notice(summary));
            }
        }
    }
}
