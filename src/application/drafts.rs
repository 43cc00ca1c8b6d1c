//! Editor drafts kept in the key-value store, keyed by slug.

use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::application::repos::KvError;
use crate::cache::{CacheStore, KvFamily, KvKey};
use crate::domain::error::DomainError;
use crate::domain::posts::{PostInput, validate_post};

#[derive(Debug, Error)]
pub enum DraftError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] KvError),
}

#[derive(Clone)]
pub struct DraftService {
    cache: CacheStore,
    ttl: Duration,
}

impl DraftService {
    pub fn new(cache: CacheStore, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Store `draft`, replacing any draft with the same slug and resetting its expiry.
    pub async fn save(&self, draft: PostInput) -> Result<(), DraftError> {
        if draft.slug.trim().is_empty() {
            return Err(DomainError::invalid_field("slug", "Invalid slug provided").into());
        }
        validate_post(&draft).map_err(DomainError::validation)?;

        self.cache
            .set_json(&KvKey::Draft(draft.slug.clone()), &draft, Some(self.ttl))
            .await?;
        info!(target = "nuxtpress::drafts", slug = %draft.slug, "draft saved");
        Ok(())
    }

    pub async fn get(&self, slug: &str) -> Result<PostInput, DraftError> {
        if slug.trim().is_empty() {
            return Err(DomainError::invalid_field("slug", "Invalid slug provided").into());
        }
        self.cache
            .get_json(&KvKey::Draft(slug.to_string()))
            .await?
            .ok_or_else(|| DomainError::not_found("draft").into())
    }

    /// All unexpired drafts, ordered by slug.
    pub async fn list(&self) -> Result<Vec<PostInput>, DraftError> {
        Ok(self.cache.list_family(KvFamily::Draft).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::KeySpace;
    use crate::infra::kv::MemoryKv;

    fn service() -> DraftService {
        let cache = CacheStore::new(Arc::new(MemoryKv::new()), KeySpace::default());
        DraftService::new(cache, Duration::from_secs(60))
    }

    fn draft(slug: &str) -> PostInput {
        PostInput {
            title: format!("Draft {slug}"),
            slug: slug.to_string(),
            content: "work in progress".to_string(),
            tags: vec!["wip".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn saved_draft_can_be_fetched_and_listed() {
        let drafts = service();
        drafts.save(draft("beta")).await.expect("save");
        drafts.save(draft("alpha")).await.expect("save");

        assert_eq!(drafts.get("beta").await.expect("get"), draft("beta"));
        let listed = drafts.list().await.expect("list");
        let slugs: Vec<_> = listed.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn missing_draft_is_not_found() {
        let err = service().get("nope").await.expect_err("missing");
        assert!(matches!(err, DraftError::Domain(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected() {
        let err = service()
            .save(PostInput {
                slug: "ok".to_string(),
                ..Default::default()
            })
            .await
            .expect_err("invalid");
        assert!(matches!(err, DraftError::Domain(DomainError::Validation { .. })));

        let err = service().save(draft("  ")).await.expect_err("blank slug");
        assert!(matches!(err, DraftError::Domain(DomainError::Validation { .. })));
    }
}
