//! Resolving who is calling, and the admin-session guard built on it.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::auth::ClientIdentity;

use super::error::ApiError;
use super::handlers::auth_to_api;
use super::state::ApiState;

pub const SESSION_COOKIE: &str = "admin";
pub const FALLBACK_COOKIE: &str = "admin_session_id";
const FORWARDED_FOR: &str = "x-forwarded-for";

/// The caller's identity and presented session token, plus the cookie jar
/// handlers use to set or clear cookies.
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: Option<ClientIdentity>,
    pub token: Option<String>,
    pub jar: CookieJar,
}

impl Caller {
    pub fn from_parts(parts: &Parts, trust_forwarded_for: bool) -> Self {
        let jar = CookieJar::from_headers(&parts.headers);

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let forwarded = trust_forwarded_for
            .then(|| forwarded_ip(&parts.headers))
            .flatten();

        let identity = forwarded
            .or(peer)
            .map(ClientIdentity::Ip)
            .or_else(|| {
                jar.get(FALLBACK_COOKIE)
                    .map(|cookie| cookie.value())
                    .filter(|value| !value.is_empty())
                    .map(|value| ClientIdentity::Fallback(value.to_string()))
            });

        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty());

        Self {
            identity,
            token,
            jar,
        }
    }
}

impl FromRequestParts<ApiState> for Caller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, state.trust_forwarded_for))
    }
}

/// Extractor that admits only requests carrying a live admin session.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

impl FromRequestParts<ApiState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_parts(parts, state.trust_forwarded_for);
        state
            .sessions
            .require_session(caller.token.as_deref(), caller.identity.as_ref())
            .await
            .map_err(auth_to_api)?;
        Ok(AdminSession)
    }
}

/// First parseable address in `X-Forwarded-For`.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all(FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|part| part.trim().parse::<IpAddr>().ok())
}

/// Cookie carrying session material: `HttpOnly`, `SameSite=Strict`, site-wide.
pub fn session_cookie(
    name: &'static str,
    value: String,
    secure: bool,
    max_age: Duration,
) -> Cookie<'static> {
    let seconds = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::seconds(seconds))
        .build()
}

/// Removal cookie matching the attributes used when the cookie was set.
pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}
