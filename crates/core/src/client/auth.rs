//! Bearer tokens and the per-user auth session.
//!
//! The backend issues a JWT pair from `POST /api/token/`. Only the payload
//! claims are read here (username and role, for display and gating); the
//! signature is the backend's business.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{instrument, warn};

use super::ApiError;
use crate::types::Role;

/// Claims read from the access token payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiry as a Unix timestamp.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Decode the payload segment of a JWT without verifying it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidToken` if the token is not three dot-separated
    /// segments or the payload is not base64url-encoded JSON.
    pub fn decode(jwt: &str) -> Result<Self, ApiError> {
        let mut segments = jwt.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ApiError::InvalidToken("expected three segments".to_string()));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ApiError::InvalidToken(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidToken(e.to_string()))
    }

    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_claim(self.role.as_deref())
    }
}

/// Access/refresh token pair with its decoded claims.
#[derive(Debug, Clone)]
pub struct AuthToken {
    /// JWT access token for API requests.
    pub access: SecretString,
    /// Refresh token, kept so a later login flow can use it.
    pub refresh: Option<SecretString>,
    pub claims: TokenClaims,
}

impl AuthToken {
    /// Wrap an access token, decoding its claims.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidToken` if the claims cannot be decoded.
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Result<Self, ApiError> {
        let access: String = access.into();
        let claims = TokenClaims::decode(&access)?;
        Ok(Self {
            access: SecretString::from(access),
            refresh: refresh.map(SecretString::from),
            claims,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.claims.username.as_deref().unwrap_or("usuario")
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.claims.role()
    }

    /// Whether the `exp` claim is in the past. Tokens without `exp` never expire.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.claims.exp.is_some_and(|exp| now >= exp)
    }
}

/// Called once each time a session holding a token is invalidated.
pub type InvalidateHook = Arc<dyn Fn() + Send + Sync>;

/// One user's authentication state.
///
/// Cheap to clone; clones share the token. Every [`super::ApiClient`] call
/// takes the session it acts for.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthSessionInner>,
}

struct AuthSessionInner {
    token: RwLock<Option<AuthToken>>,
    on_invalidate: Option<InvalidateHook>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("has_hook", &self.inner.on_invalidate.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Session with no token and no hook.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(None, None)
    }

    #[must_use]
    pub fn new(token: Option<AuthToken>, on_invalidate: Option<InvalidateHook>) -> Self {
        Self {
            inner: Arc::new(AuthSessionInner {
                token: RwLock::new(token),
                on_invalidate,
            }),
        }
    }

    /// Session holding `token`.
    #[must_use]
    pub fn with_token(token: AuthToken) -> Self {
        Self::new(Some(token), None)
    }

    /// Store a freshly obtained token.
    pub async fn set_token(&self, token: AuthToken) {
        *self.inner.token.write().await = Some(token);
    }

    pub async fn token(&self) -> Option<AuthToken> {
        self.inner.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    /// `Guest` when there is no token.
    pub async fn role(&self) -> Role {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .map_or(Role::Guest, AuthToken::role)
    }

    /// Drop the token and notify the hook.
    ///
    /// Invalidating an already empty session does nothing.
    #[instrument(skip(self))]
    pub async fn invalidate(&self) {
        let previous = self.inner.token.write().await.take();
        if let Some(token) = previous {
            warn!(username = %token.username(), "Session invalidated");
            if let Some(hook) = &self.inner.on_invalidate {
                hook();
            }
        }
    }

    /// `Authorization` header value for the current token.
    pub(crate) async fn bearer(&self) -> Result<String, ApiError> {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .map(|t| format!("Bearer {}", t.access.expose_secret()))
            .ok_or(ApiError::NotAuthenticated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Unsigned JWT with the given JSON payload.
    pub(crate) fn jwt(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_decode_claims() {
        let token = jwt(&serde_json::json!({
            "username": "bodeguero", "role": "ADMIN", "user_id": 4, "exp": 4_102_444_800_i64
        }));
        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.username.as_deref(), Some("bodeguero"));
        assert_eq!(claims.role(), Role::Admin);
        assert_eq!(claims.exp, Some(4_102_444_800));
    }

    #[test]
    fn test_missing_role_is_seller() {
        let token = AuthToken::new(jwt(&serde_json::json!({"username": "ana"})), None).unwrap();
        assert_eq!(token.role(), Role::Seller);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expired_token() {
        let token = AuthToken::new(jwt(&serde_json::json!({"exp": 1})), None).unwrap();
        assert!(token.is_expired());
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            TokenClaims::decode("not-a-jwt"),
            Err(ApiError::InvalidToken(_))
        ));
        assert!(matches!(
            TokenClaims::decode("a.b.c.d"),
            Err(ApiError::InvalidToken(_))
        ));
        assert!(matches!(
            TokenClaims::decode("a.!!!.c"),
            Err(ApiError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_invalidate_fires_hook_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hook: InvalidateHook = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let token = AuthToken::new(jwt(&serde_json::json!({"role": "SELLER"})), None).unwrap();
        let session = AuthSession::new(Some(token), Some(hook));

        assert_eq!(session.role().await, Role::Seller);
        session.invalidate().await;
        session.invalidate().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!session.is_authenticated().await);
        assert_eq!(session.role().await, Role::Guest);
        assert!(matches!(session.bearer().await, Err(ApiError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_clones_share_token() {
        let session = AuthSession::anonymous();
        let clone = session.clone();
        let token = AuthToken::new(jwt(&serde_json::json!({"role": "ADMIN"})), None).unwrap();
        clone.set_token(token).await;
        assert_eq!(session.role().await, Role::Admin);
        assert!(session.bearer().await.unwrap().starts_with("Bearer "));
    }
}
