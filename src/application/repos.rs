//! Repository traits describing persistence adapters.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::BlogPostRecord;
use crate::domain::posts::PostDate;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value backend error: {0}")]
    Backend(String),
    #[error("failed to encode or decode value for `{key}`: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl KvError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub thumbnail: Option<Vec<u8>>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub thumbnail: Option<Vec<u8>>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<BlogPostRecord>, RepoError>;

    async fn find_post_by_id(&self, id: &str) -> Result<Option<BlogPostRecord>, RepoError>;

    async fn find_post_by_slug_on(
        &self,
        slug: &str,
        date: PostDate,
    ) -> Result<Option<BlogPostRecord>, RepoError>;

    /// Distinct UTC days on which `slug` names a post.
    async fn slug_dates(&self, slug: &str) -> Result<Vec<PostDate>, RepoError>;

    async fn create_post(&self, params: CreatePostParams) -> Result<BlogPostRecord, RepoError>;

    /// Returns `None` when no row has the given id.
    async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<Option<BlogPostRecord>, RepoError>;

    /// Returns whether a row was removed.
    async fn delete_post(&self, id: &str) -> Result<bool, RepoError>;
}

/// Summary of one schema migration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub converted_columns: Vec<String>,
    pub promoted_values: u64,
    pub dropped_unique_slug: Vec<String>,
}

#[async_trait]
pub trait SchemaRepo: Send + Sync {
    /// Idempotently create the schema and reconcile legacy data.
    async fn run_migrations(&self) -> Result<MigrationReport, RepoError>;
}

/// Namespaced string store with optional per-key expiry.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError>;

    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Keys starting with `prefix`, in no particular order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, KvError>;
}

/// Liveness check for the primary store.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
