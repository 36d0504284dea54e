//! Session-related types.
//!
//! Types stored in the cookie session for authentication state.

use bodega_core::client::{ApiError, AuthSession, AuthToken};
use bodega_core::{Permission, Role};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Session-stored user identity and backend tokens.
///
/// The session store lives in server memory; the cookie only carries the
/// session id.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
    pub role: Role,
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("access", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CurrentUser {
    /// Identity taken from a freshly issued token.
    #[must_use]
    pub fn from_token(token: &AuthToken) -> Self {
        Self {
            username: token.username().to_owned(),
            role: token.role(),
            access: token.access.expose_secret().to_owned(),
            refresh: token
                .refresh
                .as_ref()
                .map(|r| r.expose_secret().to_owned()),
        }
    }

    #[must_use]
    pub const fn can(&self, permission: Permission) -> bool {
        self.role.can(permission)
    }

    /// Decode the stored token again.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidToken` if the stored token is corrupt.
    pub fn token(&self) -> Result<AuthToken, ApiError> {
        AuthToken::new(self.access.clone(), self.refresh.clone())
    }

    /// Auth session for backend calls made on this user's behalf.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidToken` if the stored token is corrupt.
    pub fn auth_session(&self) -> Result<AuthSession, ApiError> {
        Ok(AuthSession::with_token(self.token()?))
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use bodega_core::client::AuthToken;

    use super::*;

    /// Unsigned access token with the given role claim.
    pub(crate) fn token(username: &str, role: &str) -> AuthToken {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let payload = serde_json::json!({"username": username, "role": role});
        let access = format!(
            "{}.{}.firma",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        );
        AuthToken::new(access, Some("refresco".to_owned())).unwrap()
    }

    pub(crate) fn user(role: &str) -> CurrentUser {
        CurrentUser::from_token(&token("bodeguero", role))
    }

    #[test]
    fn test_from_token_keeps_claims() {
        let user = user("ADMIN");
        assert_eq!(user.username, "bodeguero");
        assert_eq!(user.role, Role::Admin);
        assert!(user.can(Permission::ManageProducts));
    }

    #[test]
    fn test_session_round_trip_keeps_token() {
        let user = user("SELLER");
        let stored = serde_json::to_value(&user).unwrap();
        let restored: CurrentUser = serde_json::from_value(stored).unwrap();
        let token = restored.token().unwrap();
        assert_eq!(token.role(), Role::Seller);
        assert!(!restored.can(Permission::ViewCost));
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let debug = format!("{:?}", user("ADMIN"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("firma"));
    }
}
