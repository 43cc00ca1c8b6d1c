use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};

use crate::domain::error::ValidationIssue;

use super::error::ApiError;

/// `axum::Json` whose rejections use the API error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::from(rejection)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                ApiError::validation(vec![ValidationIssue::new("body", err.body_text())])
            }
            JsonRejection::JsonSyntaxError(err) => {
                ApiError::bad_request("Malformed JSON body", Some(err.body_text()))
            }
            JsonRejection::MissingJsonContentType(_) => ApiError::bad_request(
                "Expected a JSON body",
                Some("set `Content-Type: application/json`".to_string()),
            ),
            other => ApiError::bad_request("Unreadable request body", Some(other.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::http::header::CONTENT_TYPE;

    use super::*;
    use crate::infra::http::api::error::codes;
    use crate::infra::http::api::models::PostCreateRequest;

    async fn extract(
        content_type: Option<&str>,
        body: &str,
    ) -> Result<ApiJson<PostCreateRequest>, ApiError> {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body.to_string())).expect("request");
        ApiJson::<PostCreateRequest>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn shape_mismatches_are_validation_errors() {
        for body in ["{}", r#"{"post": null}"#, r#"{"post": {"tags": "x"}}"#] {
            let err = extract(Some("application/json"), body)
                .await
                .expect_err("rejected");
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(err.code(), codes::VALIDATION, "{body}");
        }
    }

    #[tokio::test]
    async fn syntax_and_content_type_errors_are_bad_requests() {
        let err = extract(Some("application/json"), "{not json")
            .await
            .expect_err("rejected");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::BAD_REQUEST);

        let err = extract(None, r#"{"post": {}}"#).await.expect_err("rejected");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::BAD_REQUEST);
    }

    #[tokio::test]
    async fn well_formed_bodies_pass_through() {
        let ApiJson(body) = extract(
            Some("application/json"),
            r#"{"post": {"title": "Hi", "slug": "hi", "content": "x"}}"#,
        )
        .await
        .expect("accepted");
        assert_eq!(body.post.slug, "hi");
    }
}
