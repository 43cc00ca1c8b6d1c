//! Key-value key definitions.
//!
//! Every key lives under one namespace prefix and follows
//! `resource-type:identifier[:date-parts]`.

use std::fmt;

use crate::domain::posts::PostDate;
use crate::domain::settings::SettingField;

/// Identifies one entry in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KvKey {
    /// A single site setting.
    Setting(SettingField),
    /// Session token for a client identity.
    AdminSession(String),
    /// Snapshot of every post, newest first.
    PostsList,
    /// Snapshot of one post addressed by slug and creation day.
    PostDetail { slug: String, date: PostDate },
    /// Days on which a slug is occupied.
    SlugExists(String),
    /// Unpublished editor state, by slug.
    Draft(String),
    /// Highest schema migration version applied.
    MigrationVersion,
}

impl KvKey {
    /// Low-cardinality label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            KvKey::Setting(_) => "setting",
            KvKey::AdminSession(_) => "admin_session",
            KvKey::PostsList => "blog_posts_list",
            KvKey::PostDetail { .. } => "blog_post",
            KvKey::SlugExists(_) => "slug_exists",
            KvKey::Draft(_) => "blog_draft",
            KvKey::MigrationVersion => "migration_version",
        }
    }
}

/// Key families that can be enumerated by prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvFamily {
    Draft,
}

impl KvFamily {
    fn as_str(self) -> &'static str {
        match self {
            KvFamily::Draft => "blog_draft:",
        }
    }
}

impl fmt::Display for KvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvKey::Setting(field) => write!(f, "setting:{}", field.as_str()),
            KvKey::AdminSession(identity) => write!(f, "admin_session:{identity}"),
            KvKey::PostsList => f.write_str("blog_posts_list"),
            KvKey::PostDetail { slug, date } => write!(
                f,
                "blog_post:{slug}:{}:{}:{}",
                date.year(),
                date.month(),
                date.day()
            ),
            KvKey::SlugExists(slug) => write!(f, "slug_exists:{slug}"),
            KvKey::Draft(slug) => write!(f, "{}{slug}", KvFamily::Draft.as_str()),
            KvKey::MigrationVersion => f.write_str("migration_version"),
        }
    }
}

/// Renders keys under a fixed namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn render(&self, key: &KvKey) -> String {
        format!("{}:{key}", self.prefix)
    }

    pub fn family(&self, family: KvFamily) -> String {
        format!("{}:{}", self.prefix, family.as_str())
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("nuxtpress")
    }
}
