//! Key-value store backends.

mod memory;
mod redis_store;

pub use memory::MemoryKv;
pub use redis_store::RedisKv;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::repos::KvStore;
use crate::config::{KvBackend, KvSettings};
use crate::infra::error::InfraError;

/// A connected backend. The memory variant is kept concrete so its sweeper can run.
pub enum KvHandle {
    Memory(Arc<MemoryKv>),
    Redis(RedisKv),
}

impl KvHandle {
    pub fn store(&self) -> Arc<dyn KvStore> {
        match self {
            KvHandle::Memory(kv) => kv.clone(),
            KvHandle::Redis(kv) => Arc::new(kv.clone()),
        }
    }

    /// Start the periodic sweep for the memory backend. Redis expires keys itself.
    pub fn spawn_purger(&self, interval: Duration) -> Option<JoinHandle<()>> {
        let KvHandle::Memory(kv) = self else {
            return None;
        };
        let kv = kv.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let purged = kv.purge_expired();
                if purged > 0 {
                    debug!(target = "nuxtpress::kv", purged, "expired entries purged");
                }
            }
        }))
    }
}

pub async fn connect(settings: &KvSettings) -> Result<KvHandle, InfraError> {
    match &settings.backend {
        KvBackend::Memory => {
            info!(target = "nuxtpress::kv", "using in-memory key-value store");
            Ok(KvHandle::Memory(Arc::new(MemoryKv::new())))
        }
        KvBackend::Redis { url } => {
            let pool = deadpool_redis::Config::from_url(url)
                .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                .map_err(|err| InfraError::key_value(format!("invalid redis pool config: {err}")))?;
            let kv = RedisKv::new(pool);
            kv.ping()
                .await
                .map_err(|err| InfraError::key_value(format!("redis unreachable: {err}")))?;
            info!(target = "nuxtpress::kv", "connected to redis");
            Ok(KvHandle::Redis(kv))
        }
    }
}
