use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::identity::AdminSession;
use crate::infra::http::api::json::ApiJson;
use crate::infra::http::api::models::{
    DraftListResponse, DraftQuery, DraftResponse, DraftSaveRequest, SuccessResponse,
};
use crate::infra::http::api::state::ApiState;

use super::draft_to_api;

/// One draft when `slug` is given, otherwise all of them.
pub async fn get_drafts(
    State(state): State<ApiState>,
    _session: AdminSession,
    Query(query): Query<DraftQuery>,
) -> Result<Response, ApiError> {
    match query.slug.as_deref().filter(|slug| !slug.is_empty()) {
        Some(slug) => {
            let draft = state.drafts.get(slug).await.map_err(draft_to_api)?;
            Ok(Json(DraftResponse { draft }).into_response())
        }
        None => {
            let drafts = state.drafts.list().await.map_err(draft_to_api)?;
            Ok(Json(DraftListResponse { drafts }).into_response())
        }
    }
}

pub async fn save_draft(
    State(state): State<ApiState>,
    _session: AdminSession,
    ApiJson(body): ApiJson<DraftSaveRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.drafts.save(body.post).await.map_err(draft_to_api)?;
    Ok(Json(SuccessResponse { success: true }))
}
