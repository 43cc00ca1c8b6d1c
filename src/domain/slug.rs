//! Slug rules and per-day uniqueness resolution.
//!
//! A slug only has to be unique within the calendar day a post was created
//! on. Resolution keeps the pure probing sequence here and lets callers
//! supply the occupancy check, so persistence and caching stay outside the
//! domain.

use std::future::Future;

use thiserror::Error;

/// Ceiling on `-N` suffixes tried before giving up.
pub const MAX_SUFFIX_ATTEMPTS: usize = 64;

/// Longest slug accepted from the editor or produced by resolution.
pub const SLUG_MAX_CHARS: usize = 200;

/// Errors that can occur while resolving a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug is empty")]
    Empty,
    #[error("slug `{input}` may only contain lowercase letters, digits, and hyphens")]
    Invalid { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Errors that can occur while resolving a slug via an async occupancy check.
#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// `true` when `value` matches `^[a-z0-9-]+$`.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-')
}

/// Candidate for the given attempt: `base`, then `base-1`, `base-2`, ….
///
/// Suffixed candidates never exceed [`SLUG_MAX_CHARS`]; a long base is cut
/// short to make room for the suffix.
pub fn candidate(base: &str, attempt: usize) -> String {
    if attempt == 0 {
        return base.to_string();
    }
    let suffix = format!("-{attempt}");
    let keep = SLUG_MAX_CHARS.saturating_sub(suffix.len()).min(base.len());
    let stem = base.get(..keep).unwrap_or(base);
    format!("{stem}{suffix}")
}

/// Produce a slug that is free according to the supplied predicate.
///
/// `is_taken` resolves to `true` when the candidate already names a post on
/// the target day. The base slug is tried first, then suffixed candidates.
pub async fn resolve_unique_slug_async<F, Fut, E>(
    base: &str,
    mut is_taken: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    check_base(base)?;

    for attempt in 0..=MAX_SUFFIX_ATTEMPTS {
        let slug = candidate(base, attempt);
        if !is_taken(slug.clone())
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(slug);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted {
        base: base.to_string(),
    }))
}

fn check_base(base: &str) -> Result<(), SlugError> {
    if base.is_empty() {
        return Err(SlugError::Empty);
    }
    if !is_valid_slug(base) {
        return Err(SlugError::Invalid {
            input: base.to_string(),
        });
    }
    Ok(())
}
