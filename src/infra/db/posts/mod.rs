mod types;

use async_trait::async_trait;

use crate::application::repos::{CreatePostParams, PostsRepo, RepoError, UpdatePostParams};
use crate::domain::entities::BlogPostRecord;
use crate::domain::posts::PostDate;
use crate::domain::timestamps::{from_millis, to_millis};

use super::{PostgresRepositories, map_sqlx_error};
use types::{POST_COLUMNS, PostRow, encode_tags, encode_thumbnail};

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(&self) -> Result<Vec<BlogPostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC, id");
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(BlogPostRecord::try_from).collect()
    }

    async fn find_post_by_id(&self, id: &str) -> Result<Option<BlogPostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(BlogPostRecord::try_from).transpose()
    }

    async fn find_post_by_slug_on(
        &self,
        slug: &str,
        date: PostDate,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        let (start, end) = date.millis_range();
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts \
             WHERE slug = $1 AND created_at >= $2 AND created_at < $3 \
             ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(slug)
            .bind(start)
            .bind(end)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(BlogPostRecord::try_from).transpose()
    }

    async fn slug_dates(&self, slug: &str) -> Result<Vec<PostDate>, RepoError> {
        let created: Vec<i64> =
            sqlx::query_scalar("SELECT created_at FROM blog_posts WHERE slug = $1")
                .bind(slug)
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        let mut dates: Vec<PostDate> = created
            .into_iter()
            .filter_map(from_millis)
            .map(PostDate::of)
            .collect();
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<BlogPostRecord, RepoError> {
        let CreatePostParams {
            id,
            title,
            slug,
            content,
            thumbnail,
            thumbnail_url,
            tags,
            created_at,
        } = params;
        let created_ms = to_millis(created_at);

        let sql = format!(
            "INSERT INTO blog_posts \
             (id, title, slug, content, thumbnail, thumbnail_url, created_at, updated_at, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(slug)
            .bind(content)
            .bind(encode_thumbnail(thumbnail.as_deref()))
            .bind(thumbnail_url)
            .bind(created_ms)
            .bind(encode_tags(&tags))
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        BlogPostRecord::try_from(row)
    }

    async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        let UpdatePostParams {
            id,
            title,
            slug,
            content,
            thumbnail,
            thumbnail_url,
            tags,
            updated_at,
        } = params;

        let sql = format!(
            "UPDATE blog_posts \
             SET title = $2, slug = $3, content = $4, thumbnail = $5, \
                 thumbnail_url = $6, tags = $7, updated_at = $8 \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(slug)
            .bind(content)
            .bind(encode_thumbnail(thumbnail.as_deref()))
            .bind(thumbnail_url)
            .bind(encode_tags(&tags))
            .bind(to_millis(updated_at))
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(BlogPostRecord::try_from).transpose()
    }

    async fn delete_post(&self, id: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
