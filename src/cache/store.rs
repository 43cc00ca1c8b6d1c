//! Typed access to the key-value store.
//!
//! Values are JSON documents. The `cached`/`remember` pair is the read-through
//! path: failures there are logged and treated as a miss, so a degraded cache
//! never fails a request that the primary store can answer.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::repos::{KvError, KvStore};

use super::keys::{KeySpace, KvFamily, KvKey};

const SOURCE: &str = "cache::store";

#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KvStore>,
    keys: KeySpace,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KvStore>, keys: KeySpace) -> Self {
        Self { kv, keys }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub async fn get_raw(&self, key: &KvKey) -> Result<Option<String>, KvError> {
        self.kv.get(&self.keys.render(key)).await
    }

    pub async fn set_raw(
        &self,
        key: &KvKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), KvError> {
        self.kv.set(&self.keys.render(key), value, ttl).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &KvKey) -> Result<Option<T>, KvError> {
        let rendered = self.keys.render(key);
        match self.kv.get(&rendered).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| KvError::Codec {
                    key: rendered,
                    source,
                }),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &KvKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), KvError> {
        let rendered = self.keys.render(key);
        let raw = serde_json::to_string(value).map_err(|source| KvError::Codec {
            key: rendered.clone(),
            source,
        })?;
        self.kv.set(&rendered, &raw, ttl).await
    }

    pub async fn delete(&self, key: &KvKey) -> Result<(), KvError> {
        self.kv.delete(&self.keys.render(key)).await
    }

    /// Every decodable value in a key family. Entries that expire between
    /// listing and reading are skipped.
    pub async fn list_family<T: DeserializeOwned>(
        &self,
        family: KvFamily,
    ) -> Result<Vec<T>, KvError> {
        let prefix = self.keys.family(family);
        let mut keys = self.kv.keys(&prefix).await?;
        keys.sort();

        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(raw) = self.kv.get(&key).await? else {
                continue;
            };
            match serde_json::from_str(&raw) {
                Ok(value) => values.push(value),
                Err(err) => warn!(
                    target = SOURCE,
                    key = %key,
                    error = %err,
                    "skipping undecodable entry"
                ),
            }
        }
        Ok(values)
    }

    /// Read-through lookup. Errors and undecodable values count as a miss.
    pub async fn cached<T: DeserializeOwned>(&self, key: &KvKey) -> Option<T> {
        match self.get_json(key).await {
            Ok(Some(value)) => {
                counter!("nuxtpress_cache_hit_total", "family" => key.label()).increment(1);
                Some(value)
            }
            Ok(None) => {
                counter!("nuxtpress_cache_miss_total", "family" => key.label()).increment(1);
                None
            }
            Err(err) => {
                counter!("nuxtpress_cache_miss_total", "family" => key.label()).increment(1);
                warn!(
                    target = SOURCE,
                    key = key.label(),
                    error = %err,
                    "cache read failed; falling back to store"
                );
                None
            }
        }
    }

    /// Populate a read-through entry. Failures are logged and dropped.
    pub async fn remember<T: Serialize + ?Sized>(
        &self,
        key: &KvKey,
        value: &T,
        ttl: Option<Duration>,
    ) {
        if let Err(err) = self.set_json(key, value, ttl).await {
            warn!(
                target = SOURCE,
                key = key.label(),
                error = %err,
                "cache write failed"
            );
        } else {
            debug!(target = SOURCE, key = key.label(), "cache populated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::kv::MemoryKv;

    fn store() -> CacheStore {
        CacheStore::new(Arc::new(MemoryKv::new()), KeySpace::default())
    }

    #[tokio::test]
    async fn json_values_round_trip_under_namespace() {
        let store = store();
        let key = KvKey::SlugExists("hello".to_string());

        store
            .set_json(&key, &vec!["2024-01-01"], None)
            .await
            .expect("set");

        let raw = store.get_raw(&key).await.expect("get");
        assert_eq!(raw.as_deref(), Some("[\"2024-01-01\"]"));
        let decoded: Option<Vec<String>> = store.get_json(&key).await.expect("get");
        assert_eq!(decoded, Some(vec!["2024-01-01".to_string()]));
    }

    #[tokio::test]
    async fn undecodable_values_are_a_cache_miss() {
        let store = store();
        let key = KvKey::PostsList;
        store.set_raw(&key, "not json", None).await.expect("set");

        let cached: Option<Vec<String>> = store.cached(&key).await;
        assert!(cached.is_none());
        assert!(store.get_json::<Vec<String>>(&key).await.is_err());
    }

    #[tokio::test]
    async fn family_listing_only_returns_that_family() {
        let store = store();
        store
            .set_json(&KvKey::Draft("b".to_string()), &"second", None)
            .await
            .expect("set");
        store
            .set_json(&KvKey::Draft("a".to_string()), &"first", None)
            .await
            .expect("set");
        store
            .set_json(&KvKey::SlugExists("a".to_string()), &"other", None)
            .await
            .expect("set");

        let drafts: Vec<String> = store.list_family(KvFamily::Draft).await.expect("list");
        assert_eq!(drafts, vec!["first".to_string(), "second".to_string()]);
    }
}
