//! Blog post handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;

use crate::domain::entities::BlogPostRecord;
use crate::domain::error::ValidationIssue;
use crate::domain::posts::PostDate;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::identity::AdminSession;
use crate::infra::http::api::json::ApiJson;
use crate::infra::http::api::models::{
    FindPostQuery, PostCreateRequest, PostUpdateRequest, RemovePostQuery,
};
use crate::infra::http::api::state::ApiState;

use super::post_to_api;

pub async fn list_posts(
    State(state): State<ApiState>,
) -> Result<Json<Vec<BlogPostRecord>>, ApiError> {
    let posts = state.posts.list().await.map_err(post_to_api)?;
    Ok(Json(posts))
}

pub async fn find_post(
    State(state): State<ApiState>,
    Query(query): Query<FindPostQuery>,
) -> Result<Json<BlogPostRecord>, ApiError> {
    let (slug, date) = parse_find_query(&query)?;
    let post = state.posts.find(&slug, date).await.map_err(post_to_api)?;
    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<ApiState>,
    _session: AdminSession,
    ApiJson(body): ApiJson<PostCreateRequest>,
) -> Result<Json<BlogPostRecord>, ApiError> {
    let post = state.posts.create(body.post).await.map_err(post_to_api)?;
    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<ApiState>,
    _session: AdminSession,
    ApiJson(body): ApiJson<PostUpdateRequest>,
) -> Result<Json<BlogPostRecord>, ApiError> {
    let post = state.posts.update(body.post).await.map_err(post_to_api)?;
    Ok(Json(post))
}

pub async fn remove_post(
    State(state): State<ApiState>,
    _session: AdminSession,
    Query(query): Query<RemovePostQuery>,
) -> Result<StatusCode, ApiError> {
    let id = query.id.unwrap_or_default();
    state.posts.delete(&id).await.map_err(post_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_find_query(query: &FindPostQuery) -> Result<(String, PostDate), ApiError> {
    let mut issues = Vec::new();

    let slug = query.slug.as_deref().map(str::trim).unwrap_or_default();
    if slug.is_empty() {
        issues.push(ValidationIssue::new("slug", "Slug is required"));
    }

    let year = parse_part::<i32>(query.year.as_deref(), "year", &mut issues);
    let month = parse_part::<u8>(query.month.as_deref(), "month", &mut issues);
    let day = parse_part::<u8>(query.day.as_deref(), "day", &mut issues);

    let date = match (year, month, day) {
        (Some(year), Some(month), Some(day)) => {
            let date = PostDate::from_parts(year, month, day);
            if date.is_none() {
                issues.push(ValidationIssue::new("date", "Not a calendar date"));
            }
            date
        }
        _ => None,
    };

    match date {
        Some(date) if issues.is_empty() => Ok((slug.to_string(), date)),
        _ => Err(ApiError::validation(issues)),
    }
}

fn parse_part<T: std::str::FromStr>(
    raw: Option<&str>,
    field: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<T> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => {
            let parsed = value.parse().ok();
            if parsed.is_none() {
                issues.push(ValidationIssue::new(field, "Must be a number"));
            }
            parsed
        }
        None => {
            issues.push(ValidationIssue::new(field, "Required"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(slug: &str, year: &str, month: &str, day: &str) -> FindPostQuery {
        FindPostQuery {
            slug: Some(slug.to_string()),
            year: Some(year.to_string()),
            month: Some(month.to_string()),
            day: Some(day.to_string()),
        }
    }

    #[test]
    fn find_query_accepts_unpadded_parts() {
        let (slug, date) = parse_find_query(&query("hello", "2024", "3", "9")).expect("valid");
        assert_eq!(slug, "hello");
        assert_eq!(date, PostDate::from_parts(2024, 3, 9).expect("date"));
    }

    #[test]
    fn find_query_rejects_bad_parts() {
        for bad in [
            query("", "2024", "3", "9"),
            query("hello", "year", "3", "9"),
            query("hello", "2024", "13", "1"),
            query("hello", "2023", "2", "29"),
            FindPostQuery::default(),
        ] {
            let err = parse_find_query(&bad).expect_err("invalid");
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }
}
