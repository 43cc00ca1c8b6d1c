//! Shared-password sessions.
//!
//! A successful login mints a random token and stores it against the
//! caller's identity. A request is authenticated when the token it presents
//! equals the one stored for its identity. One identity holds at most one
//! token; logging in again replaces it.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use metrics::counter;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::KvError;
use crate::cache::{CacheStore, KvKey};

const TOKEN_BYTES: usize = 32;
/// Placeholder shipped in sample configs; refusing it keeps a fresh install locked.
pub const PLACEHOLDER_PASSWORD: &str = "password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("admin password is not configured")]
    Misconfigured,
    #[error("not authenticated")]
    Unauthorized,
    #[error(transparent)]
    Store(#[from] KvError),
}

/// Key under which a caller's session is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    Ip(IpAddr),
    /// Random id carried in a cookie when no address could be resolved.
    Fallback(String),
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::Ip(ip) => write!(f, "{ip}"),
            ClientIdentity::Fallback(id) => f.write_str(id),
        }
    }
}

/// Hex-encoded session token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(random_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// 32 bytes from the OS generator, hex-encoded.
pub fn random_hex() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct SessionService {
    cache: CacheStore,
    password_digest: Option<Vec<u8>>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(cache: CacheStore, password: Option<&str>, ttl: Duration) -> Self {
        let password_digest = password
            .filter(|value| !value.is_empty() && *value != PLACEHOLDER_PASSWORD)
            .map(digest);
        if password_digest.is_none() {
            warn!(
                target = "nuxtpress::auth",
                "admin password is unset or left at the placeholder; admin endpoints are disabled"
            );
        }
        Self {
            cache,
            password_digest,
            ttl,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.password_digest.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check the password and start a session for `identity`.
    pub async fn login(
        &self,
        password: &str,
        identity: &ClientIdentity,
    ) -> Result<SessionToken, AuthError> {
        let expected = self
            .password_digest
            .as_deref()
            .ok_or(AuthError::Misconfigured)?;

        let supplied = digest(password);
        if supplied.ct_eq(expected).unwrap_u8() == 0 {
            counter!("nuxtpress_auth_login_failure_total").increment(1);
            warn!(
                target = "nuxtpress::auth",
                identity = %identity,
                "login rejected"
            );
            return Err(AuthError::Unauthorized);
        }

        let token = SessionToken::generate();
        self.cache
            .set_raw(
                &KvKey::AdminSession(identity.to_string()),
                token.as_str(),
                Some(self.ttl),
            )
            .await?;

        info!(target = "nuxtpress::auth", identity = %identity, "admin session started");
        Ok(token)
    }

    /// Whether `token` is the live session for `identity`.
    pub async fn verify(
        &self,
        token: Option<&str>,
        identity: Option<&ClientIdentity>,
    ) -> Result<bool, AuthError> {
        let (Some(token), Some(identity)) = (token, identity) else {
            return Ok(false);
        };
        if token.is_empty() {
            return Ok(false);
        }

        let stored = self
            .cache
            .get_raw(&KvKey::AdminSession(identity.to_string()))
            .await?;

        Ok(stored.is_some_and(|stored| stored.as_bytes().ct_eq(token.as_bytes()).into()))
    }

    /// Guard for admin operations. Anything short of a valid session is
    /// `Unauthorized`, so callers cannot tell which check failed.
    pub async fn require_session(
        &self,
        token: Option<&str>,
        identity: Option<&ClientIdentity>,
    ) -> Result<(), AuthError> {
        if !self.is_configured() {
            return Err(AuthError::Misconfigured);
        }
        if self.verify(token, identity).await? {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    /// End the session for `identity`. Store failures are logged only.
    pub async fn logout(&self, identity: Option<&ClientIdentity>) {
        let Some(identity) = identity else {
            return;
        };
        if let Err(err) = self
            .cache
            .delete(&KvKey::AdminSession(identity.to_string()))
            .await
        {
            warn!(
                target = "nuxtpress::auth",
                identity = %identity,
                error = %err,
                "failed to delete admin session"
            );
        }
    }
}

fn digest(value: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use super::*;
    use crate::cache::KeySpace;
    use crate::infra::kv::MemoryKv;

    const TTL: Duration = Duration::from_secs(14 * 24 * 3600);

    fn service(password: Option<&str>) -> SessionService {
        let cache = CacheStore::new(Arc::new(MemoryKv::new()), KeySpace::default());
        SessionService::new(cache, password, TTL)
    }

    fn ip(last: u8) -> ClientIdentity {
        ClientIdentity::Ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, last)))
    }

    #[tokio::test]
    async fn login_then_verify_succeeds() {
        let sessions = service(Some("s3cret"));
        let identity = ip(1);

        let token = sessions.login("s3cret", &identity).await.expect("login");
        assert_eq!(token.as_str().len(), 64);

        let ok = sessions
            .verify(Some(token.as_str()), Some(&identity))
            .await
            .expect("verify");
        assert!(ok);
    }

    #[tokio::test]
    async fn wrong_passwords_fail_regardless_of_length() {
        let sessions = service(Some("s3cret"));
        let long = "x".repeat(4096);
        for attempt in ["", "s", "s3cre", "s3cret!", "S3CRET", long.as_str()] {
            let err = sessions.login(attempt, &ip(1)).await.expect_err("rejected");
            assert!(matches!(err, AuthError::Unauthorized), "{attempt:?}");
        }
    }

    #[tokio::test]
    async fn token_is_bound_to_identity() {
        let sessions = service(Some("s3cret"));
        let token = sessions.login("s3cret", &ip(1)).await.expect("login");

        let ok = sessions
            .verify(Some(token.as_str()), Some(&ip(2)))
            .await
            .expect("verify");
        assert!(!ok);
    }

    #[tokio::test]
    async fn relogin_replaces_previous_token() {
        let sessions = service(Some("s3cret"));
        let first = sessions.login("s3cret", &ip(1)).await.expect("login");
        let second = sessions.login("s3cret", &ip(1)).await.expect("login");
        assert_ne!(first, second);

        assert!(
            !sessions
                .verify(Some(first.as_str()), Some(&ip(1)))
                .await
                .expect("verify")
        );
        assert!(
            sessions
                .verify(Some(second.as_str()), Some(&ip(1)))
                .await
                .expect("verify")
        );
    }

    #[tokio::test]
    async fn logout_revokes_session() {
        let sessions = service(Some("s3cret"));
        let token = sessions.login("s3cret", &ip(1)).await.expect("login");

        sessions.logout(Some(&ip(1))).await;

        assert!(
            !sessions
                .verify(Some(token.as_str()), Some(&ip(1)))
                .await
                .expect("verify")
        );
    }

    #[tokio::test]
    async fn missing_credentials_do_not_verify() {
        let sessions = service(Some("s3cret"));
        assert!(!sessions.verify(None, Some(&ip(1))).await.expect("verify"));
        assert!(!sessions.verify(Some("abc"), None).await.expect("verify"));
        assert!(!sessions.verify(Some(""), Some(&ip(1))).await.expect("verify"));
    }

    #[tokio::test]
    async fn placeholder_password_is_treated_as_misconfigured() {
        for password in [None, Some(""), Some(PLACEHOLDER_PASSWORD)] {
            let sessions = service(password);
            assert!(!sessions.is_configured());
            let err = sessions
                .login(PLACEHOLDER_PASSWORD, &ip(1))
                .await
                .expect_err("misconfigured");
            assert!(matches!(err, AuthError::Misconfigured));
            let err = sessions
                .require_session(Some("token"), Some(&ip(1)))
                .await
                .expect_err("misconfigured");
            assert!(matches!(err, AuthError::Misconfigured));
        }
    }

    #[tokio::test]
    async fn guard_rejects_without_revealing_reason() {
        let sessions = service(Some("s3cret"));
        let err = sessions
            .require_session(None, Some(&ip(1)))
            .await
            .expect_err("unauthorized");
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[test]
    fn tokens_are_random_hex() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a, b);
        assert!(a.as_str().bytes().all(|byte| byte.is_ascii_hexdigit()));
        assert_eq!(format!("{a:?}"), "SessionToken(<redacted>)");
    }
}
