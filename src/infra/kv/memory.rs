use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::repos::{KvError, KvStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Process-local store for single-instance deployments and tests.
///
/// Expired entries are hidden on read and reclaimed by [`MemoryKv::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, Entry>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let kv = MemoryKv::new();
        kv.set("a", "1", None).await.expect("set");
        assert_eq!(kv.get("a").await.expect("get").as_deref(), Some("1"));

        kv.set("a", "2", None).await.expect("set");
        assert_eq!(kv.get("a").await.expect("get").as_deref(), Some("2"));

        kv.delete("a").await.expect("delete");
        assert!(kv.get("a").await.expect("get").is_none());
        kv.delete("a").await.expect("deleting a missing key is fine");
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let kv = MemoryKv::new();
        kv.set("gone", "x", Some(Duration::ZERO)).await.expect("set");
        kv.set("kept", "y", Some(Duration::from_secs(60)))
            .await
            .expect("set");

        assert!(kv.get("gone").await.expect("get").is_none());
        assert_eq!(kv.keys("").await.expect("keys"), vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn purge_reclaims_expired_entries() {
        let kv = MemoryKv::new();
        kv.set("a", "x", Some(Duration::ZERO)).await.expect("set");
        kv.set("b", "x", Some(Duration::ZERO)).await.expect("set");
        kv.set("c", "x", None).await.expect("set");

        assert_eq!(kv.purge_expired(), 2);
        assert_eq!(kv.len(), 1);
    }

    #[tokio::test]
    async fn keys_filter_by_prefix() {
        let kv = MemoryKv::new();
        kv.set("p:blog_draft:a", "1", None).await.expect("set");
        kv.set("p:blog_draft:b", "1", None).await.expect("set");
        kv.set("p:setting:name", "1", None).await.expect("set");

        let mut keys = kv.keys("p:blog_draft:").await.expect("keys");
        keys.sort();
        assert_eq!(keys, vec!["p:blog_draft:a", "p:blog_draft:b"]);
    }
}
