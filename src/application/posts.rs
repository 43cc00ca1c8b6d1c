//! Blog post reads and writes with cache coordination.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::repos::{CreatePostParams, PostsRepo, RepoError, UpdatePostParams};
use crate::cache::{CacheConfig, CacheStore, InvalidationPlan, Invalidator, KvKey};
use crate::domain::entities::{BlogPostRecord, PostIdentity};
use crate::domain::error::{DomainError, ValidationIssue};
use crate::domain::posts::{PostDate, PostInput, PostUpdateInput, ValidPost, validate_post};
use crate::domain::slug::{SlugAsyncError, SlugError, resolve_unique_slug_async};

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for PostServiceError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(slug) => Self::Slug(slug),
            SlugAsyncError::Predicate(repo) => Self::Repo(repo),
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn PostsRepo>,
    cache: CacheStore,
    invalidator: Invalidator,
    config: CacheConfig,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostsRepo>, cache: CacheStore, config: CacheConfig) -> Self {
        let invalidator = Invalidator::new(cache.clone());
        Self {
            repo,
            cache,
            invalidator,
            config,
        }
    }

    /// Every post, newest first. Served from the list snapshot when present.
    pub async fn list(&self) -> Result<Vec<BlogPostRecord>, PostServiceError> {
        if let Some(posts) = self.cache.cached(&KvKey::PostsList).await {
            return Ok(posts);
        }

        let posts = self.repo.list_posts().await?;
        self.cache.remember(&KvKey::PostsList, &posts, None).await;
        Ok(posts)
    }

    /// The post named `slug` on `date`.
    pub async fn find(
        &self,
        slug: &str,
        date: PostDate,
    ) -> Result<BlogPostRecord, PostServiceError> {
        let key = KvKey::PostDetail {
            slug: slug.to_string(),
            date,
        };
        if let Some(post) = self.cache.cached(&key).await {
            return Ok(post);
        }

        let post = self
            .repo
            .find_post_by_slug_on(slug, date)
            .await?
            .ok_or_else(|| DomainError::not_found("post"))?;

        self.cache
            .remember(&key, &post, Some(self.config.post_ttl))
            .await;
        Ok(post)
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: PostInput) -> Result<BlogPostRecord, PostServiceError> {
        let valid = validate_post(&input).map_err(DomainError::validation)?;

        let created_at = OffsetDateTime::now_utc();
        let date = PostDate::of(created_at);
        let slug = self.resolve_slug(&valid.slug, date, None).await?;

        let record = self
            .repo
            .create_post(CreatePostParams {
                id: Uuid::new_v4().simple().to_string(),
                title: valid.title,
                slug,
                content: valid.content,
                thumbnail: valid.thumbnail,
                thumbnail_url: valid.thumbnail_url,
                tags: valid.tags,
                created_at,
            })
            .await?;

        let identity = PostIdentity::from(&record);
        self.invalidator
            .apply(&InvalidationPlan::for_create(&identity))
            .await;

        info!(
            target = "nuxtpress::posts",
            id = %record.id,
            slug = %record.slug,
            date = %identity.date,
            "post created"
        );
        Ok(record)
    }

    #[instrument(skip(self, input), fields(id = %input.id))]
    pub async fn update(
        &self,
        input: PostUpdateInput,
    ) -> Result<BlogPostRecord, PostServiceError> {
        let valid = validate_update(&input)?;

        let previous = self
            .repo
            .find_post_by_id(&input.id)
            .await?
            .ok_or_else(|| DomainError::not_found("post"))?;
        let previous_identity = PostIdentity::from(&previous);

        let slug = if valid.slug == previous.slug {
            valid.slug
        } else {
            self.resolve_slug(&valid.slug, previous_identity.date, Some(&previous.slug))
                .await?
        };

        let updated = self
            .repo
            .update_post(UpdatePostParams {
                id: input.id.clone(),
                title: valid.title,
                slug,
                content: valid.content,
                thumbnail: valid.thumbnail,
                thumbnail_url: valid.thumbnail_url,
                tags: valid.tags,
                updated_at: OffsetDateTime::now_utc(),
            })
            .await?;

        // The row can vanish between the read and the write.
        let plan = match updated.as_ref() {
            Some(record) => {
                InvalidationPlan::for_update(Some(&previous_identity), &PostIdentity::from(record))
            }
            None => InvalidationPlan::for_delete(Some(&previous_identity)),
        };
        self.invalidator.apply(&plan).await;

        let updated = updated.ok_or_else(|| DomainError::not_found("post"))?;
        info!(
            target = "nuxtpress::posts",
            id = %updated.id,
            slug = %updated.slug,
            previous_slug = %previous.slug,
            "post updated"
        );
        Ok(updated)
    }

    /// Delete by id. Unknown ids are not an error; only the list snapshot is dropped.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), PostServiceError> {
        if id.trim().is_empty() {
            return Err(DomainError::invalid_field("id", "ID is required").into());
        }

        let previous = self.repo.find_post_by_id(id).await?;
        let removed = self.repo.delete_post(id).await?;
        let identity = previous
            .as_ref()
            .filter(|_| removed)
            .map(PostIdentity::from);

        self.invalidator
            .apply(&InvalidationPlan::for_delete(identity.as_ref()))
            .await;

        info!(
            target = "nuxtpress::posts",
            id,
            removed,
            "post delete processed"
        );
        Ok(())
    }

    /// First free candidate for `base` on `date`. `own_slug` is the slug the
    /// post being updated holds today, which never counts as a collision.
    async fn resolve_slug(
        &self,
        base: &str,
        date: PostDate,
        own_slug: Option<&str>,
    ) -> Result<String, PostServiceError> {
        let slug = resolve_unique_slug_async(base, |candidate| async move {
            if own_slug == Some(candidate.as_str()) {
                return Ok(false);
            }
            self.slug_taken_on(&candidate, date).await
        })
        .await?;
        Ok(slug)
    }

    async fn slug_taken_on(&self, slug: &str, date: PostDate) -> Result<bool, RepoError> {
        let key = KvKey::SlugExists(slug.to_string());
        let dates: Vec<PostDate> = match self.cache.cached(&key).await {
            Some(dates) => dates,
            None => {
                let dates = self.repo.slug_dates(slug).await?;
                self.cache
                    .remember(&key, &dates, Some(self.config.slug_exists_ttl))
                    .await;
                dates
            }
        };
        Ok(dates.contains(&date))
    }
}

fn validate_update(input: &PostUpdateInput) -> Result<ValidPost, DomainError> {
    let mut issues = Vec::new();
    if input.id.trim().is_empty() {
        issues.push(ValidationIssue::new("id", "ID is required"));
    }
    match validate_post(&input.post) {
        Ok(valid) if issues.is_empty() => Ok(valid),
        Ok(_) => Err(DomainError::validation(issues)),
        Err(mut post_issues) => {
            issues.append(&mut post_issues);
            Err(DomainError::validation(issues))
        }
    }
}
