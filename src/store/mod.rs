//! Key/value persistence with per-key expiry.
//!
//! The session cache and the processed-marker gate both live behind the
//! [`KeyValueStore`] trait so the backing store can be swapped without
//! touching the pipeline. [`MemoryStore`] is the in-process default.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::error::StoreError;

/// A string key/value store with per-key time-to-live.
///
/// `get` must treat an expired entry as absent. Single-key writes are
/// atomic; nothing beyond that is guaranteed across keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value for `key`, or `None` when missing or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove `key` if present.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: OffsetDateTime,
}

/// In-process store backed by a concurrent map with lazy expiry.
///
/// Expired entries are evicted on the next read of their key, so memory
/// is bounded by the set of keys written within one retention window.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet evicted) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = OffsetDateTime::now_utc();

        // Drop the map guard before evicting to keep the shard lock single-entry.
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.expires_at > now {
                    return Ok(Some(entry.value.clone()));
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = OffsetDateTime::now_utc() + ttl;
        self.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = MemoryStore::new();
        store
            .set("session", "token-1", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            store.get("session").await.unwrap(),
            Some("token-1".to_string())
        );
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let store = MemoryStore::new();
        store
            .set("marker", "1", Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get("marker").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn set_overwrites_existing_value() {
        let store = MemoryStore::new();
        store
            .set("session", "old", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set("session", "new", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            store.get("session").await.unwrap(),
            Some("new".to_string())
        );
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = MemoryStore::new();
        store
            .set("session", "token", Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("session").await.unwrap();

        assert_eq!(store.get("session").await.unwrap(), None);
    }
}
