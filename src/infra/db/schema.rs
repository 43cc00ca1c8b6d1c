//! Idempotent schema setup and legacy data reconciliation for `blog_posts`.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::repos::{MigrationReport, RepoError, SchemaRepo};
use crate::domain::timestamps::{SECONDS_EPOCH_CEILING, normalize_legacy_timestamp, to_millis};

use super::{PostgresRepositories, map_sqlx_error};

const TIMESTAMP_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS blog_posts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    content TEXT NOT NULL,
    thumbnail TEXT,
    thumbnail_url TEXT,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL,
    tags TEXT
)
"#;

const CREATE_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_blog_posts_slug ON blog_posts (slug)",
    "CREATE INDEX IF NOT EXISTS idx_blog_posts_created_at ON blog_posts (created_at DESC)",
];

#[async_trait]
impl SchemaRepo for PostgresRepositories {
    async fn run_migrations(&self) -> Result<MigrationReport, RepoError> {
        let mut report = MigrationReport::default();

        sqlx::query(CREATE_TABLE)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        for column in TIMESTAMP_COLUMNS {
            if self.convert_timestamp_column(column).await? {
                report.converted_columns.push(column.to_string());
            }
        }

        for column in TIMESTAMP_COLUMNS {
            report.promoted_values += self.promote_second_epochs(column).await?;
        }

        report.dropped_unique_slug = self.drop_unique_slug().await?;

        for statement in CREATE_INDEXES {
            sqlx::query(statement)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        }

        Ok(report)
    }
}

impl PostgresRepositories {
    async fn column_type(&self, column: &str) -> Result<Option<String>, RepoError> {
        sqlx::query_scalar(
            "SELECT data_type::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = 'blog_posts' \
               AND column_name = $1",
        )
        .bind(column)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    /// Rewrite a non-`bigint` timestamp column as epoch milliseconds.
    /// Returns whether a conversion happened.
    async fn convert_timestamp_column(&self, column: &'static str) -> Result<bool, RepoError> {
        let data_type = match self.column_type(column).await? {
            None => return Ok(false),
            Some(data_type) if data_type == "bigint" => return Ok(false),
            Some(data_type) => data_type,
        };
        info!(
            target = "nuxtpress::db::schema",
            column,
            data_type = %data_type,
            "converting legacy timestamp column"
        );
        // Native date/time columns are read as epoch millis; everything else as text.
        let read_expr = if data_type.starts_with("timestamp") || data_type == "date" {
            format!("(EXTRACT(EPOCH FROM {column}) * 1000)::bigint::text")
        } else {
            format!("{column}::text")
        };

        let staging = format!("{column}_ms");
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query(&format!(
            "ALTER TABLE blog_posts ADD COLUMN IF NOT EXISTS {staging} BIGINT"
        ))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as(&format!("SELECT id, {read_expr} FROM blog_posts"))
                .fetch_all(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        let fallback = to_millis(OffsetDateTime::now_utc());
        for (id, raw) in rows {
            let millis = match raw.as_deref().and_then(normalize_legacy_timestamp) {
                Some(millis) => millis,
                None => {
                    warn!(
                        target = "nuxtpress::db::schema",
                        id = %id,
                        column,
                        raw = raw.as_deref().unwrap_or(""),
                        "unparseable legacy timestamp; using current time"
                    );
                    fallback
                }
            };
            sqlx::query(&format!("UPDATE blog_posts SET {staging} = $1 WHERE id = $2"))
                .bind(millis)
                .bind(&id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        swap_columns(&mut tx, column, &staging).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(true)
    }

    async fn promote_second_epochs(&self, column: &'static str) -> Result<u64, RepoError> {
        let result = sqlx::query(&format!(
            "UPDATE blog_posts SET {column} = {column} * 1000 \
             WHERE {column} >= 0 AND {column} < $1"
        ))
        .bind(SECONDS_EPOCH_CEILING)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let promoted = result.rows_affected();
        if promoted > 0 {
            info!(
                target = "nuxtpress::db::schema",
                column, promoted, "promoted second-precision timestamps"
            );
        }
        Ok(promoted)
    }

    /// Slugs are unique per day, not globally; remove any table-wide uniqueness.
    async fn drop_unique_slug(&self) -> Result<Vec<String>, RepoError> {
        let mut dropped = Vec::new();

        let constraints: Vec<String> = sqlx::query_scalar(
            "SELECT c.conname::text FROM pg_constraint c \
             JOIN pg_class t ON t.oid = c.conrelid \
             JOIN pg_namespace n ON n.oid = t.relnamespace \
             WHERE n.nspname = current_schema() AND t.relname = 'blog_posts' \
               AND c.contype = 'u' AND pg_get_constraintdef(c.oid) = 'UNIQUE (slug)'",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        for name in constraints {
            sqlx::query(&format!(
                "ALTER TABLE blog_posts DROP CONSTRAINT IF EXISTS {}",
                quote_ident(&name)
            ))
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
            dropped.push(name);
        }

        let indexes: Vec<String> = sqlx::query_scalar(
            "SELECT indexname::text FROM pg_indexes \
             WHERE schemaname = current_schema() AND tablename = 'blog_posts' \
               AND indexdef LIKE 'CREATE UNIQUE INDEX %(slug)'",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        for name in indexes {
            sqlx::query(&format!("DROP INDEX IF EXISTS {}", quote_ident(&name)))
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;
            dropped.push(name);
        }

        if !dropped.is_empty() {
            warn!(
                target = "nuxtpress::db::schema",
                dropped = ?dropped,
                "removed table-wide unique constraint on slug"
            );
        }
        Ok(dropped)
    }
}

async fn swap_columns(
    tx: &mut Transaction<'_, Postgres>,
    column: &str,
    staging: &str,
) -> Result<(), RepoError> {
    let statements = [
        format!("UPDATE blog_posts SET {staging} = 0 WHERE {staging} IS NULL"),
        format!("ALTER TABLE blog_posts DROP COLUMN {column}"),
        format!("ALTER TABLE blog_posts RENAME COLUMN {staging} TO {column}"),
        format!("ALTER TABLE blog_posts ALTER COLUMN {column} SET NOT NULL"),
    ];
    for statement in &statements {
        sqlx::query(statement)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::quote_ident;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("blog_posts_slug_key"), "\"blog_posts_slug_key\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
