//! Blog post input rules, tag storage, and calendar-day identity.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month, OffsetDateTime, Time, UtcOffset};
use url::Url;

use crate::domain::error::ValidationIssue;
use crate::domain::slug::{SLUG_MAX_CHARS, is_valid_slug};
use crate::domain::timestamps::to_millis;

pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 500_000;
pub const TAG_MAX_CHARS: usize = 50;

const TAG_SEPARATOR: char = ',';

/// Post fields as submitted by the editor. Also the stored shape of a draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    /// Base64-encoded image bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdateInput {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub post: PostInput,
}

/// Post fields after validation, ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub thumbnail: Option<Vec<u8>>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
}

pub fn validate_post(input: &PostInput) -> Result<ValidPost, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let title_len = input.title.chars().count();
    if title_len == 0 {
        issues.push(ValidationIssue::new("title", "Title is required"));
    } else if title_len > TITLE_MAX_CHARS {
        issues.push(ValidationIssue::new(
            "title",
            "Title must be 100 characters or less",
        ));
    }

    let slug_len = input.slug.chars().count();
    if slug_len == 0 {
        issues.push(ValidationIssue::new("slug", "Slug is required"));
    } else if slug_len > SLUG_MAX_CHARS {
        issues.push(ValidationIssue::new(
            "slug",
            "Slug must be 200 characters or less",
        ));
    } else if !is_valid_slug(&input.slug) {
        issues.push(ValidationIssue::new(
            "slug",
            "Slug must only contain lowercase letters, numbers, and hyphens",
        ));
    }

    let content_len = input.content.chars().count();
    if content_len == 0 {
        issues.push(ValidationIssue::new("content", "Content is required"));
    } else if content_len > CONTENT_MAX_CHARS {
        issues.push(ValidationIssue::new(
            "content",
            "Content must be 500,000 characters or less",
        ));
    }

    let thumbnail_url = input
        .thumbnail_url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(value) = thumbnail_url
        && !is_absolute_http_url(value)
    {
        issues.push(ValidationIssue::new("thumbnail_url", "Must be a valid URL"));
    }

    let thumbnail = match input
        .thumbnail
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(encoded) => match STANDARD.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(_) => {
                issues.push(ValidationIssue::new(
                    "thumbnail",
                    "Thumbnail must be base64-encoded",
                ));
                None
            }
        },
        None => None,
    };

    let mut tags = Vec::with_capacity(input.tags.len());
    for (index, tag) in input.tags.iter().enumerate() {
        let trimmed = tag.trim();
        if trimmed.chars().count() > TAG_MAX_CHARS {
            issues.push(ValidationIssue::new(
                format!("tags.{index}"),
                "Tag must be 50 characters or less",
            ));
        } else if trimmed.contains(TAG_SEPARATOR) {
            issues.push(ValidationIssue::new(
                format!("tags.{index}"),
                "Tag must not contain commas",
            ));
        } else if !trimmed.is_empty() {
            tags.push(trimmed.to_string());
        }
    }

    if !issues.is_empty() {
        return Err(issues);
    }

    Ok(ValidPost {
        title: input.title.clone(),
        slug: input.slug.clone(),
        content: input.content.clone(),
        thumbnail,
        thumbnail_url: thumbnail_url.map(str::to_string),
        tags,
    })
}

fn is_absolute_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

/// Render tags for the comma-joined `tags` column.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

/// Parse the comma-joined `tags` column.
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(TAG_SEPARATOR)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// UTC calendar day a post was created on; half of a post's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostDate(Date);

impl PostDate {
    pub fn of(instant: OffsetDateTime) -> Self {
        Self(instant.to_offset(UtcOffset::UTC).date())
    }

    pub fn from_parts(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = Month::try_from(month).ok()?;
        Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    pub fn today() -> Self {
        Self::of(OffsetDateTime::now_utc())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u8 {
        u8::from(self.0.month())
    }

    pub fn day(&self) -> u8 {
        self.0.day()
    }

    /// Half-open `[start, end)` range of epoch milliseconds covering this day.
    pub fn millis_range(&self) -> (i64, i64) {
        let start = self.0.with_time(Time::MIDNIGHT).assume_utc();
        let end = start + time::Duration::DAY;
        (to_millis(start), to_millis(end))
    }
}

impl fmt::Display for PostDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year(),
            self.month(),
            self.day()
        )
    }
}

impl Serialize for PostDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PostDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_post_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid post date `{raw}`")))
    }
}

fn parse_post_date(raw: &str) -> Option<PostDate> {
    let mut parts = raw.splitn(3, '-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    PostDate::from_parts(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn input() -> PostInput {
        PostInput {
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            content: "# Hello".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_post_is_valid() {
        let valid = validate_post(&input()).expect("valid post");
        assert_eq!(valid.slug, "hello");
        assert!(valid.tags.is_empty());
        assert!(valid.thumbnail.is_none());
    }

    #[test]
    fn every_failing_field_is_reported() {
        let post = PostInput {
            title: String::new(),
            slug: "Not A Slug".to_string(),
            content: String::new(),
            thumbnail_url: Some("not a url".to_string()),
            tags: vec!["x".repeat(51)],
            ..Default::default()
        };

        let issues = validate_post(&post).expect_err("invalid post");
        let paths: Vec<_> = issues.iter().map(|issue| issue.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["title", "slug", "content", "thumbnail_url", "tags.0"]
        );
    }

    #[test]
    fn empty_thumbnail_url_is_allowed() {
        let post = PostInput {
            thumbnail_url: Some(String::new()),
            ..input()
        };
        let valid = validate_post(&post).expect("valid post");
        assert!(valid.thumbnail_url.is_none());
    }

    #[test]
    fn thumbnail_is_decoded_from_base64() {
        let post = PostInput {
            thumbnail: Some(STANDARD.encode([1u8, 2, 3])),
            ..input()
        };
        let valid = validate_post(&post).expect("valid post");
        assert_eq!(valid.thumbnail.as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn title_limit_counts_characters_not_bytes() {
        let post = PostInput {
            title: "é".repeat(100),
            ..input()
        };
        assert!(validate_post(&post).is_ok());
    }

    #[test]
    fn tags_are_trimmed_and_split_back() {
        let tags = vec!["rust".to_string(), "web".to_string()];
        let joined = join_tags(&tags);
        assert_eq!(joined, "rust,web");
        assert_eq!(split_tags(Some("rust, web ,")), tags);
        assert!(split_tags(None).is_empty());
    }

    #[test]
    fn post_date_uses_utc_calendar_day() {
        let late_evening_west = datetime!(2024-06-01 22:30 -05:00);
        let date = PostDate::of(late_evening_west);
        assert_eq!(date.to_string(), "2024-06-02");
        assert_eq!((date.year(), date.month(), date.day()), (2024, 6, 2));
    }

    #[test]
    fn post_date_range_spans_one_day() {
        let date = PostDate::from_parts(2024, 1, 31).expect("valid date");
        let (start, end) = date.millis_range();
        assert_eq!(end - start, 86_400_000);
        assert_eq!(start, to_millis(datetime!(2024-01-31 00:00 UTC)));
    }

    #[test]
    fn impossible_dates_are_rejected() {
        assert!(PostDate::from_parts(2024, 2, 30).is_none());
        assert!(PostDate::from_parts(2024, 13, 1).is_none());
    }

    #[test]
    fn post_date_serializes_as_iso_day() {
        let date = PostDate::from_parts(2024, 3, 9).expect("valid date");
        let json = serde_json::to_string(&date).expect("serialize");
        assert_eq!(json, "\"2024-03-09\"");
        let back: PostDate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, date);
    }
}
