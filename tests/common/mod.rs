//! In-memory doubles for the persistence ports, plus a ready-made API state.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use nuxtpress::application::auth::SessionService;
use nuxtpress::application::drafts::DraftService;
use nuxtpress::application::lifecycle::SchemaLifecycle;
use nuxtpress::application::posts::PostService;
use nuxtpress::application::repos::{
    CreatePostParams, HealthRepo, KvError, KvStore, MigrationReport, PostsRepo, RepoError,
    SchemaRepo, UpdatePostParams,
};
use nuxtpress::application::settings::SettingsService;
use nuxtpress::cache::{CacheConfig, CacheStore, KeySpace, KvKey};
use nuxtpress::domain::entities::{BlogPostRecord, SiteSettingsRecord};
use nuxtpress::domain::posts::{PostDate, PostInput};
use nuxtpress::infra::http::ApiState;
use nuxtpress::infra::kv::MemoryKv;

pub const PASSWORD: &str = "correct horse battery staple";
pub const SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 3600);

#[derive(Default)]
pub struct FakePosts {
    rows: Mutex<Vec<BlogPostRecord>>,
}

impl FakePosts {
    pub async fn seed(&self, record: BlogPostRecord) {
        self.rows.lock().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl PostsRepo for FakePosts {
    async fn list_posts(&self) -> Result<Vec<BlogPostRecord>, RepoError> {
        let mut rows = self.rows.lock().await.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn find_post_by_id(&self, id: &str) -> Result<Option<BlogPostRecord>, RepoError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn find_post_by_slug_on(
        &self,
        slug: &str,
        date: PostDate,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|row| row.slug == slug && row.date() == date)
            .cloned())
    }

    async fn slug_dates(&self, slug: &str) -> Result<Vec<PostDate>, RepoError> {
        let rows = self.rows.lock().await;
        let mut dates: Vec<PostDate> = rows
            .iter()
            .filter(|row| row.slug == slug)
            .map(BlogPostRecord::date)
            .collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<BlogPostRecord, RepoError> {
        let record = BlogPostRecord {
            id: params.id,
            title: params.title,
            slug: params.slug,
            content: params.content,
            thumbnail: params.thumbnail,
            thumbnail_url: params.thumbnail_url,
            created_at: params.created_at,
            updated_at: params.created_at,
            tags: params.tags,
        };
        self.rows.lock().await.push(record.clone());
        Ok(record)
    }

    async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.iter_mut().find(|row| row.id == params.id) else {
            return Ok(None);
        };
        row.title = params.title;
        row.slug = params.slug;
        row.content = params.content;
        row.thumbnail = params.thumbnail;
        row.thumbnail_url = params.thumbnail_url;
        row.tags = params.tags;
        row.updated_at = params.updated_at;
        Ok(Some(row.clone()))
    }

    async fn delete_post(&self, id: &str) -> Result<bool, RepoError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }
}

/// Counts migration runs.
#[derive(Default)]
pub struct FakeSchema {
    pub runs: AtomicUsize,
}

#[async_trait]
impl SchemaRepo for FakeSchema {
    async fn run_migrations(&self) -> Result<MigrationReport, RepoError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(MigrationReport::default())
    }
}

pub struct FakeHealth {
    pub healthy: AtomicBool,
}

impl Default for FakeHealth {
    fn default() -> Self {
        Self {
            healthy: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl HealthRepo for FakeHealth {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::Timeout)
        }
    }
}

/// Memory store that remembers every key it was asked to delete.
#[derive(Default)]
pub struct RecordingKv {
    inner: MemoryKv,
    deleted: StdMutex<Vec<String>>,
}

impl RecordingKv {
    pub fn take_deleted(&self) -> Vec<String> {
        match self.deleted.lock() {
            Ok(mut deleted) => std::mem::take(&mut *deleted),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl KvStore for RecordingKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(key.to_string());
        }
        self.inner.delete(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        self.inner.keys(prefix).await
    }
}

pub fn site_defaults() -> SiteSettingsRecord {
    SiteSettingsRecord {
        name: "NuxtPress".to_string(),
        description: "My NuxtPress blog".to_string(),
        author: "Anonymous".to_string(),
        theme_color: "#1e40af".to_string(),
        favicon: "/favicon.ico".to_string(),
        favicon_png: "/favicon.png".to_string(),
        github: String::new(),
        twitter: String::new(),
        instagram: String::new(),
        patreon: String::new(),
        linkedin: String::new(),
        discord: String::new(),
        support_email: String::new(),
    }
}

pub struct Harness {
    pub posts_repo: Arc<FakePosts>,
    pub schema: Arc<FakeSchema>,
    pub health: Arc<FakeHealth>,
    pub kv: Arc<RecordingKv>,
    pub cache: CacheStore,
    pub state: ApiState,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_password(Some(PASSWORD))
    }

    pub fn with_password(password: Option<&str>) -> Self {
        let posts_repo = Arc::new(FakePosts::default());
        let schema = Arc::new(FakeSchema::default());
        let health = Arc::new(FakeHealth::default());
        let kv = Arc::new(RecordingKv::default());
        let cache = CacheStore::new(kv.clone(), KeySpace::default());
        let config = CacheConfig::default();

        let state = ApiState {
            sessions: Arc::new(SessionService::new(cache.clone(), password, SESSION_TTL)),
            posts: Arc::new(PostService::new(
                posts_repo.clone(),
                cache.clone(),
                config.clone(),
            )),
            drafts: Arc::new(DraftService::new(cache.clone(), config.draft_ttl)),
            settings: Arc::new(SettingsService::new(cache.clone(), site_defaults())),
            lifecycle: Arc::new(SchemaLifecycle::new(schema.clone(), cache.clone())),
            health: health.clone(),
            secure_cookies: false,
            trust_forwarded_for: false,
        };

        Self {
            posts_repo,
            schema,
            health,
            kv,
            cache,
            state,
        }
    }

    /// Fully-qualified store key, as the cache renders it.
    pub fn key(&self, key: &KvKey) -> String {
        self.cache.keys().render(key)
    }
}

pub fn post_input(title: &str, slug: &str) -> PostInput {
    PostInput {
        title: title.to_string(),
        slug: slug.to_string(),
        content: format!("# {title}\n\nBody text."),
        thumbnail: None,
        thumbnail_url: None,
        tags: vec!["rust".to_string()],
    }
}

pub fn record_at(id: &str, slug: &str, created_at: OffsetDateTime) -> BlogPostRecord {
    BlogPostRecord {
        id: id.to_string(),
        title: format!("Seeded {slug}"),
        slug: slug.to_string(),
        content: "Seeded body".to_string(),
        thumbnail: None,
        thumbnail_url: None,
        created_at,
        updated_at: created_at,
        tags: Vec::new(),
    }
}
