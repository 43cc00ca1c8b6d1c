//! Cache invalidation driven by post writes.
//!
//! A plan lists every key whose snapshot may be stale after a write. Plans
//! are executed after the relational write commits; each delete is attempted
//! independently and failures are logged, never propagated.

use metrics::counter;
use tracing::{debug, warn};

use crate::domain::entities::PostIdentity;

use super::keys::KvKey;
use super::store::CacheStore;

const SOURCE: &str = "cache::invalidation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostWrite {
    Create,
    Update,
    Delete,
}

impl PostWrite {
    fn as_str(self) -> &'static str {
        match self {
            PostWrite::Create => "create",
            PostWrite::Update => "update",
            PostWrite::Delete => "delete",
        }
    }
}

/// Ordered, de-duplicated set of keys to delete after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    write: PostWrite,
    keys: Vec<KvKey>,
}

impl InvalidationPlan {
    fn new(write: PostWrite) -> Self {
        Self {
            write,
            keys: vec![KvKey::PostsList],
        }
    }

    fn push(&mut self, key: KvKey) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    fn detail(identity: &PostIdentity) -> KvKey {
        KvKey::PostDetail {
            slug: identity.slug.clone(),
            date: identity.date,
        }
    }

    pub fn for_create(created: &PostIdentity) -> Self {
        let mut plan = Self::new(PostWrite::Create);
        plan.push(KvKey::SlugExists(created.slug.clone()));
        plan.push(Self::detail(created));
        plan
    }

    /// `previous` is the row as it was before the write, if it was found.
    pub fn for_update(previous: Option<&PostIdentity>, current: &PostIdentity) -> Self {
        let mut plan = Self::new(PostWrite::Update);
        plan.push(KvKey::SlugExists(current.slug.clone()));
        if let Some(previous) = previous {
            plan.push(Self::detail(previous));
            if previous.slug != current.slug {
                plan.push(KvKey::SlugExists(previous.slug.clone()));
            }
        }
        plan.push(Self::detail(current));
        plan
    }

    /// `removed` is `None` when no row had the id; only the list is dropped.
    pub fn for_delete(removed: Option<&PostIdentity>) -> Self {
        let mut plan = Self::new(PostWrite::Delete);
        if let Some(removed) = removed {
            plan.push(KvKey::SlugExists(removed.slug.clone()));
            plan.push(Self::detail(removed));
        }
        plan
    }

    pub fn write(&self) -> PostWrite {
        self.write
    }

    pub fn keys(&self) -> &[KvKey] {
        &self.keys
    }
}

/// Outcome of executing a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationOutcome {
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Invalidator {
    cache: CacheStore,
}

impl Invalidator {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    pub async fn apply(&self, plan: &InvalidationPlan) -> InvalidationOutcome {
        let mut outcome = InvalidationOutcome::default();
        let write = plan.write().as_str();

        for key in plan.keys() {
            match self.cache.delete(key).await {
                Ok(()) => {
                    outcome.deleted += 1;
                    counter!(
                        "nuxtpress_cache_invalidation_total",
                        "write" => write,
                        "family" => key.label()
                    )
                    .increment(1);
                }
                Err(err) => {
                    outcome.failed += 1;
                    counter!(
                        "nuxtpress_cache_invalidation_failure_total",
                        "write" => write,
                        "family" => key.label()
                    )
                    .increment(1);
                    warn!(
                        target = SOURCE,
                        write,
                        key = %self.cache.keys().render(key),
                        error = %err,
                        "cache invalidation failed; entry may serve stale data until it expires"
                    );
                }
            }
        }

        debug!(
            target = SOURCE,
            write,
            deleted = outcome.deleted,
            failed = outcome.failed,
            "cache invalidation applied"
        );
        outcome
    }
}
