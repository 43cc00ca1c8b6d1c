//! One-time schema setup.
//!
//! Migrations run at most once per process and at most once per deployment:
//! a process-local flag short-circuits the common path, a version marker in
//! the key-value store lets new processes skip work another already did, and
//! a mutex keeps concurrent first requests from racing each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::application::repos::{MigrationReport, RepoError, SchemaRepo};
use crate::cache::{CacheStore, KvKey};

/// Bumped whenever the migration set changes.
pub const SCHEMA_VERSION: u32 = 1;

pub struct SchemaLifecycle {
    repo: Arc<dyn SchemaRepo>,
    cache: CacheStore,
    initialized: AtomicBool,
    gate: Mutex<()>,
}

impl SchemaLifecycle {
    pub fn new(repo: Arc<dyn SchemaRepo>, cache: CacheStore) -> Self {
        Self {
            repo,
            cache,
            initialized: AtomicBool::new(false),
            gate: Mutex::new(()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Make sure migrations have run. Failures are logged and retried on the
    /// next call; the request that triggered them proceeds regardless.
    pub async fn ensure(&self) {
        if self.is_initialized() {
            return;
        }
        if self.marker_is_current().await {
            self.initialized.store(true, Ordering::Release);
            return;
        }

        let _guard = self.gate.lock().await;
        if self.is_initialized() {
            return;
        }

        if let Err(err) = self.migrate().await {
            error!(
                target = "nuxtpress::lifecycle",
                error = %err,
                "schema migration failed; will retry on next request"
            );
        }
    }

    /// Run migrations now. With `force`, the version marker is ignored.
    pub async fn run(&self, force: bool) -> Result<Option<MigrationReport>, RepoError> {
        let _guard = self.gate.lock().await;
        if !force && (self.is_initialized() || self.marker_is_current().await) {
            self.initialized.store(true, Ordering::Release);
            return Ok(None);
        }
        self.migrate().await.map(Some)
    }

    async fn migrate(&self) -> Result<MigrationReport, RepoError> {
        let report = self.repo.run_migrations().await?;
        info!(
            target = "nuxtpress::lifecycle",
            version = SCHEMA_VERSION,
            converted_columns = ?report.converted_columns,
            promoted_values = report.promoted_values,
            dropped_unique_slug = ?report.dropped_unique_slug,
            "schema migrations applied"
        );

        if let Err(err) = self
            .cache
            .set_json(&KvKey::MigrationVersion, &SCHEMA_VERSION, None)
            .await
        {
            warn!(
                target = "nuxtpress::lifecycle",
                error = %err,
                "failed to record schema version"
            );
        }
        self.initialized.store(true, Ordering::Release);
        Ok(report)
    }

    async fn marker_is_current(&self) -> bool {
        match self.cache.get_json::<u32>(&KvKey::MigrationVersion).await {
            Ok(Some(version)) => version >= SCHEMA_VERSION,
            Ok(None) => false,
            Err(err) => {
                warn!(
                    target = "nuxtpress::lifecycle",
                    error = %err,
                    "failed to read schema version marker"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::KeySpace;
    use crate::infra::kv::MemoryKv;

    #[derive(Default)]
    struct CountingRepo {
        calls: AtomicUsize,
        fail_first: AtomicBool,
    }

    #[async_trait]
    impl SchemaRepo for CountingRepo {
        async fn run_migrations(&self) -> Result<MigrationReport, RepoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail_first.swap(false, Ordering::SeqCst) {
                return Err(RepoError::from_persistence("connection refused"));
            }
            Ok(MigrationReport::default())
        }
    }

    fn cache() -> CacheStore {
        CacheStore::new(Arc::new(MemoryKv::new()), KeySpace::default())
    }

    #[tokio::test]
    async fn concurrent_callers_migrate_once() {
        let repo = Arc::new(CountingRepo::default());
        let lifecycle = Arc::new(SchemaLifecycle::new(repo.clone(), cache()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lifecycle = lifecycle.clone();
            handles.push(tokio::spawn(async move { lifecycle.ensure().await }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
        assert!(lifecycle.is_initialized());
    }

    #[tokio::test]
    async fn marker_skips_migrations_in_new_process() {
        let cache = cache();
        let first = Arc::new(CountingRepo::default());
        SchemaLifecycle::new(first.clone(), cache.clone())
            .ensure()
            .await;

        let second = Arc::new(CountingRepo::default());
        let lifecycle = SchemaLifecycle::new(second.clone(), cache);
        lifecycle.ensure().await;

        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        assert!(lifecycle.is_initialized());
    }

    #[tokio::test]
    async fn failure_is_retried_on_next_call() {
        let repo = Arc::new(CountingRepo {
            fail_first: AtomicBool::new(true),
            ..Default::default()
        });
        let lifecycle = SchemaLifecycle::new(repo.clone(), cache());

        lifecycle.ensure().await;
        assert!(!lifecycle.is_initialized());

        lifecycle.ensure().await;
        assert!(lifecycle.is_initialized());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forced_run_ignores_marker() {
        let repo = Arc::new(CountingRepo::default());
        let lifecycle = SchemaLifecycle::new(repo.clone(), cache());

        assert!(lifecycle.run(false).await.expect("run").is_some());
        assert!(lifecycle.run(false).await.expect("run").is_none());
        assert!(lifecycle.run(true).await.expect("run").is_some());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    }
}
