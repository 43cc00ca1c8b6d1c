//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::posts::PostDate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostRecord {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub tags: Vec<String>,
}

impl BlogPostRecord {
    pub fn date(&self) -> PostDate {
        PostDate::of(self.created_at)
    }
}

/// The slice of a post needed to invalidate its cache entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostIdentity {
    pub slug: String,
    pub date: PostDate,
}

impl From<&BlogPostRecord> for PostIdentity {
    fn from(record: &BlogPostRecord) -> Self {
        Self {
            slug: record.slug.clone(),
            date: record.date(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettingsRecord {
    pub name: String,
    pub description: String,
    pub author: String,
    pub theme_color: String,
    pub favicon: String,
    pub favicon_png: String,
    pub github: String,
    pub twitter: String,
    pub instagram: String,
    pub patreon: String,
    pub linkedin: String,
    pub discord: String,
    pub support_email: String,
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}
