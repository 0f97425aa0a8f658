//! Sequential validation of link batches

use crate::subscription::models::SubscriptionLink;
use crate::subscription::prober::LivenessProber;
use crate::subscription::store::LinkStore;
use futures::stream::{self, StreamExt};
use std::pin::pin;
use tracing::{debug, info, warn};

/// Counts for a finished validation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Targets whose outcome was applied to a record
    pub probed: usize,
    pub active: usize,
    pub expired: usize,
    /// Targets no longer in the collection when their probe finished
    pub skipped: usize,
}

/// Probes links one at a time, persisting after every probe.
///
/// Exactly one request is in flight at any moment and each result is saved
/// before the next probe starts.
#[derive(Clone)]
pub struct ValidationRunner {
    prober: LivenessProber,
}

impl ValidationRunner {
    pub fn new(prober: LivenessProber) -> Self {
        Self { prober }
    }

    pub fn prober(&self) -> &LivenessProber {
        &self.prober
    }

    /// Probe `targets` in order and fold each outcome into `links`.
    ///
    /// `on_update` sees every record right after it was updated and saved.
    /// Save failures are logged; the in-memory collection stays authoritative.
    pub async fn run<F>(
        &self,
        links: &mut [SubscriptionLink],
        targets: &[SubscriptionLink],
        store: &dyn LinkStore,
        mut on_update: F,
    ) -> ValidationSummary
    where
        F: FnMut(&SubscriptionLink),
    {
        let mut summary = ValidationSummary::default();
        let mut outcomes = pin!(stream::iter(targets).then(|target| async move {
            (target, self.prober.probe(&target.url).await)
        }));

        while let Some((target, outcome)) = outcomes.next().await {
            let Some(link) = links.iter_mut().find(|l| l.id == target.id) else {
                debug!(url = %target.url, "link evicted before its probe finished");
                summary.skipped += 1;
                continue;
            };

            summary.probed += 1;
            if outcome.is_active() {
                summary.active += 1;
            } else {
                summary.expired += 1;
            }
            link.apply_probe(&outcome);
            let updated = link.clone();

            if let Err(e) = store.save(links).await {
                warn!(error = %e, "failed to persist probe result");
            }
            debug!(url = %updated.url, status = %updated.status, ping = outcome.ping_ms, "probed");
            on_update(&updated);
        }

        info!(
            probed = summary.probed,
            active = summary.active,
            expired = summary.expired,
            skipped = summary.skipped,
            "validation finished"
        );
        summary
    }
}
