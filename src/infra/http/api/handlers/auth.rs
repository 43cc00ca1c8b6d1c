//! Login, session check and logout.

use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::CookieJar;

use crate::application::auth::{ClientIdentity, random_hex};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::identity::{
    Caller, FALLBACK_COOKIE, SESSION_COOKIE, expired_cookie, session_cookie,
};
use crate::infra::http::api::json::ApiJson;
use crate::infra::http::api::models::{LoginRequest, OkResponse, VerifyResponse};
use crate::infra::http::api::state::ApiState;

use super::auth_to_api;

pub async fn login(
    State(state): State<ApiState>,
    caller: Caller,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<OkResponse>), ApiError> {
    let Caller { identity, jar, .. } = caller;
    let ttl = state.sessions.ttl();

    // Without a resolvable address the session is keyed to a random cookie id.
    let (identity, jar) = match identity {
        Some(identity) => (identity, jar),
        None => {
            let id = random_hex();
            let jar = jar.add(session_cookie(
                FALLBACK_COOKIE,
                id.clone(),
                state.secure_cookies,
                ttl,
            ));
            (ClientIdentity::Fallback(id), jar)
        }
    };

    let token = state
        .sessions
        .login(&body.password, &identity)
        .await
        .map_err(auth_to_api)?;

    let jar = jar.add(session_cookie(
        SESSION_COOKIE,
        token.into_inner(),
        state.secure_cookies,
        ttl,
    ));
    Ok((jar, Json(OkResponse { ok: true })))
}

pub async fn verify(
    State(state): State<ApiState>,
    caller: Caller,
) -> Result<Json<VerifyResponse>, ApiError> {
    let logged_in = state
        .sessions
        .verify(caller.token.as_deref(), caller.identity.as_ref())
        .await
        .map_err(auth_to_api)?;
    Ok(Json(VerifyResponse { logged_in }))
}

pub async fn logout(
    State(state): State<ApiState>,
    caller: Caller,
) -> (CookieJar, Json<OkResponse>) {
    state.sessions.logout(caller.identity.as_ref()).await;
    let jar = caller
        .jar
        .remove(expired_cookie(SESSION_COOKIE))
        .remove(expired_cookie(FALLBACK_COOKIE));
    (jar, Json(OkResponse { ok: true }))
}
