//! Key/value cache with per-key expiry for resolved daily schedules.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use mockable::Clock;
use tokio::sync::RwLock;

use crate::schedule::ExternalSchedule;

/// Cache key for one calendar day at the configured location.
pub fn daily_key(date: NaiveDate) -> String {
    format!("prayer_times:{}", date.format("%Y-%m-%d"))
}

#[async_trait]
pub trait ScheduleCache: Send + Sync {
    async fn has(&self, key: &str) -> bool;
    async fn get(&self, key: &str) -> Option<ExternalSchedule>;
    async fn put(&self, key: &str, value: ExternalSchedule, ttl: Duration);
    async fn forget(&self, key: &str);
}

struct Entry {
    value: ExternalSchedule,
    expires_at: DateTime<Utc>,
}

/// Process-local cache. Expired entries are dropped on access and on every write.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    async fn live(&self, key: &str) -> Option<ExternalSchedule> {
        let now = self.clock.utc();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
        }
        None
    }
}

#[async_trait]
impl ScheduleCache for MemoryCache {
    async fn has(&self, key: &str) -> bool {
        self.live(key).await.is_some()
    }

    async fn get(&self, key: &str) -> Option<ExternalSchedule> {
        self.live(key).await
    }

    async fn put(&self, key: &str, value: ExternalSchedule, ttl: Duration) {
        let now = self.clock.utc();
        let mut entries = self.entries.write().await;
        // Keys are per day, so old days are never read again.
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    async fn forget(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}
