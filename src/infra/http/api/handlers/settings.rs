use axum::Json;
use axum::extract::State;

use crate::domain::entities::SiteSettingsRecord;
use crate::domain::settings::SettingsPatch;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::identity::AdminSession;
use crate::infra::http::api::json::ApiJson;
use crate::infra::http::api::state::ApiState;

use super::settings_to_api;

pub async fn get_settings(
    State(state): State<ApiState>,
) -> Result<Json<SiteSettingsRecord>, ApiError> {
    let settings = state.settings.load().await.map_err(settings_to_api)?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<ApiState>,
    _session: AdminSession,
    ApiJson(patch): ApiJson<SettingsPatch>,
) -> Result<Json<SiteSettingsRecord>, ApiError> {
    let settings = state
        .settings
        .update(patch)
        .await
        .map_err(settings_to_api)?;
    Ok(Json(settings))
}
