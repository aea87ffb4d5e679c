use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::core::errors::ApiError;

/// Fixed-window counter for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Result of one atomic check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    pub admitted: bool,
    pub entry: RateLimitEntry,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records one request for `key`. Must be atomic per key: a request
    /// over `limit` is refused without touching the stored count.
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
        limit: u32,
    ) -> Result<WindowHit, ApiError>;

    /// Drops every entry whose window ended before `now`; returns how many.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, ApiError>;
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryStore {
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
        limit: u32,
    ) -> Result<WindowHit, ApiError> {
        let mut lock = self.entries.lock().await;
        let entry = lock.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            reset_at: now + window,
        });

        if entry.count == 0 || now > entry.reset_at {
            *entry = RateLimitEntry {
                count: 1,
                reset_at: now + window,
            };
            return Ok(WindowHit {
                admitted: true,
                entry: *entry,
            });
        }

        if entry.count < limit {
            entry.count += 1;
            return Ok(WindowHit {
                admitted: true,
                entry: *entry,
            });
        }

        Ok(WindowHit {
            admitted: false,
            entry: *entry,
        })
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, ApiError> {
        let mut lock = self.entries.lock().await;
        let before = lock.len();
        lock.retain(|_, entry| entry.reset_at >= now);
        Ok(before - lock.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).expect("valid timestamp")
    }

    #[tokio::test]
    async fn refused_hit_leaves_count_unchanged() {
        let store = InMemoryStore::new();
        let window = Duration::milliseconds(1_000);

        assert!(store.hit("a", at(0), window, 1).await.unwrap().admitted);
        let refused = store.hit("a", at(10), window, 1).await.unwrap();
        assert!(!refused.admitted);
        assert_eq!(refused.entry.count, 1);
        assert_eq!(refused.entry.reset_at, at(1_000));
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_windows() {
        let store = InMemoryStore::new();
        let window = Duration::milliseconds(1_000);
        store.hit("old", at(0), window, 5).await.unwrap();
        store.hit("new", at(900), window, 5).await.unwrap();

        let removed = store.sweep(at(1_500)).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
        let hit = store.hit("new", at(1_600), window, 5).await.unwrap();
        assert_eq!(hit.entry.count, 2);
    }
}
