//! API handlers organized by resource.
//!
//! Error conversions shared across the resources live here.

mod auth;
mod blog;
mod drafts;
mod health;
mod settings;

pub use auth::*;
pub use blog::*;
pub use drafts::*;
pub use health::*;
pub use settings::*;

use axum::http::StatusCode;
use tracing::error;

use crate::application::auth::AuthError;
use crate::application::drafts::DraftError;
use crate::application::posts::PostServiceError;
use crate::application::repos::{KvError, RepoError};
use crate::application::settings::SettingsError;
use crate::domain::error::DomainError;
use crate::domain::slug::SlugError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub(crate) fn kv_to_api(err: KvError) -> ApiError {
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        codes::STORE,
        "Key-value store unavailable",
        Some(err.to_string()),
    )
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound { entity } => ApiError::not_found(match entity {
            "post" => "Post not found",
            "draft" => "Draft not found",
            _ => "Resource not found",
        }),
        DomainError::Validation { issues } => ApiError::validation(issues),
        DomainError::Invariant { message } => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            "Internal error",
            Some(message),
        ),
    }
}

pub(crate) fn auth_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::Unauthorized => ApiError::unauthorized(),
        AuthError::Misconfigured => {
            error!(
                target = "nuxtpress::http::auth",
                "admin password is not configured; refusing admin access"
            );
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::MISCONFIGURED,
                "Server authentication is not configured",
                None,
            )
        }
        AuthError::Store(err) => kv_to_api(err),
    }
}

pub(crate) fn post_to_api(err: PostServiceError) -> ApiError {
    match err {
        PostServiceError::Domain(err) => domain_to_api(err),
        PostServiceError::Slug(SlugError::Exhausted { base }) => ApiError::new(
            StatusCode::CONFLICT,
            codes::SLUG_EXHAUSTED,
            "No free slug for this day",
            Some(base),
        ),
        PostServiceError::Slug(err) => {
            ApiError::bad_request("Invalid slug", Some(err.to_string()))
        }
        PostServiceError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn draft_to_api(err: DraftError) -> ApiError {
    match err {
        DraftError::Domain(err) => domain_to_api(err),
        DraftError::Store(err) => kv_to_api(err),
    }
}

pub(crate) fn settings_to_api(err: SettingsError) -> ApiError {
    match err {
        SettingsError::Domain(err) => domain_to_api(err),
        SettingsError::Store(err) => kv_to_api(err),
    }
}
