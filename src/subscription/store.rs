//! Link collection merging and persistence

use crate::subscription::models::{SubscriptionLink, MAX_LINKS};
use crate::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::debug;

/// Key under which the collection is stored
pub const LINKS_KEY: &str = "vpn_sub_links";

/// Links of `incoming` whose URL is not yet in `existing`.
pub fn new_links(existing: &[SubscriptionLink], incoming: &[SubscriptionLink]) -> Vec<SubscriptionLink> {
    let mut seen: HashSet<&str> = existing.iter().map(|l| l.url.as_str()).collect();
    incoming
        .iter()
        .filter(|l| seen.insert(l.url.as_str()))
        .cloned()
        .collect()
}

/// Merge a discovered batch into the collection.
///
/// New URLs are prepended (existing records win ties) and the result is
/// truncated to [`MAX_LINKS`], evicting the oldest entries.
pub fn merge(existing: &[SubscriptionLink], incoming: &[SubscriptionLink]) -> Vec<SubscriptionLink> {
    let mut merged = new_links(existing, incoming);
    merged.extend(existing.iter().cloned());
    merged.truncate(MAX_LINKS);
    merged
}

/// Persistence capability for the link collection
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Read the saved collection; `None` when nothing was ever saved.
    async fn load(&self) -> Result<Option<Vec<SubscriptionLink>>>;

    /// Replace the saved collection.
    async fn save(&self, links: &[SubscriptionLink]) -> Result<()>;
}

/// SQLite-backed store keeping the collection as JSON under [`LINKS_KEY`]
pub struct SqliteLinkStore {
    pool: SqlitePool,
}

impl SqliteLinkStore {
    /// Open (and create if missing) the database at `database_url`
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // One connection keeps writes serialized and makes `sqlite::memory:` usable
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn load(&self) -> Result<Option<Vec<SubscriptionLink>>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
                .bind(LINKS_KEY)
                .fetch_optional(&self.pool)
                .await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, links: &[SubscriptionLink]) -> Result<()> {
        let json = serde_json::to_string(links)?;
        sqlx::query(
            "INSERT INTO kv_store (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(LINKS_KEY)
        .bind(json)
        .execute(&self.pool)
        .await?;
        debug!(count = links.len(), "saved link collection");
        Ok(())
    }
}

/// In-process store, used in tests and when no database is wanted
#[derive(Default)]
pub struct MemoryLinkStore {
    links: Mutex<Option<Vec<SubscriptionLink>>>,
    saves: Mutex<usize>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(links: Vec<SubscriptionLink>) -> Self {
        Self {
            links: Mutex::new(Some(links)),
            saves: Mutex::new(0),
        }
    }

    /// Snapshot of what was last saved
    pub fn snapshot(&self) -> Option<Vec<SubscriptionLink>> {
        self.links.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|s| *s).unwrap_or_default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn load(&self) -> Result<Option<Vec<SubscriptionLink>>> {
        Ok(self.snapshot())
    }

    async fn save(&self, links: &[SubscriptionLink]) -> Result<()> {
        let mut guard = self
            .links
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *guard = Some(links.to_vec());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}
