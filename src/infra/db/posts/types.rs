use base64::{Engine, engine::general_purpose::STANDARD};

use crate::application::repos::RepoError;
use crate::domain::entities::BlogPostRecord;
use crate::domain::posts::{join_tags, split_tags};
use crate::domain::timestamps::from_millis;

pub(super) const POST_COLUMNS: &str =
    "id, title, slug, content, thumbnail, thumbnail_url, created_at, updated_at, tags";

#[derive(sqlx::FromRow)]
pub(super) struct PostRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub thumbnail: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub tags: Option<String>,
}

impl TryFrom<PostRow> for BlogPostRecord {
    type Error = RepoError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let created_at = from_millis(row.created_at).ok_or_else(|| {
            RepoError::integrity(format!("post `{}` has invalid created_at", row.id))
        })?;
        let updated_at = from_millis(row.updated_at).ok_or_else(|| {
            RepoError::integrity(format!("post `{}` has invalid updated_at", row.id))
        })?;
        let thumbnail = row
            .thumbnail
            .filter(|encoded| !encoded.is_empty())
            .map(|encoded| STANDARD.decode(encoded))
            .transpose()
            .map_err(|err| {
                RepoError::integrity(format!("post `{}` has corrupt thumbnail: {err}", row.id))
            })?;

        Ok(Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            thumbnail,
            thumbnail_url: row.thumbnail_url,
            created_at,
            updated_at,
            tags: split_tags(row.tags.as_deref()),
        })
    }
}

pub(super) fn encode_thumbnail(bytes: Option<&[u8]>) -> Option<String> {
    bytes.map(|bytes| STANDARD.encode(bytes))
}

pub(super) fn encode_tags(tags: &[String]) -> Option<String> {
    (!tags.is_empty()).then(|| join_tags(tags))
}
