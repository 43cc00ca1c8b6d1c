pub mod api;
mod middleware;

pub use api::ApiState;
pub use middleware::RequestContext;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware as axum_middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

use middleware::{ensure_schema, log_responses, set_request_context};

/// The full HTTP surface: the JSON API plus the health check.
pub fn build_router(state: ApiState) -> Router {
    api::build_api_router()
        .route("/health", get(api::handlers::health))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            ensure_schema,
        ))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
