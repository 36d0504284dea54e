//! REST client for the inventory backend.
//!
//! # Architecture
//!
//! - [`ApiClient`] owns the HTTP connection pool and the backend base URL.
//!   It is cheap to clone and shared by every request handler.
//! - [`AuthSession`] owns one user's bearer token. Every API call borrows
//!   the session it acts for; nothing reads a global token.
//! - A `401` from any endpoint clears the session and fires its invalidate
//!   hook. There is no retry with the refresh token.
//! - Multi-step writes (product, then images) run in order and report
//!   partial failures instead of rolling back.

pub mod auth;
mod http;
mod inventory;
mod products;

pub use auth::{AuthSession, AuthToken, InvalidateHook, TokenClaims};
pub use http::ApiClient;
pub use inventory::Document;
pub use products::{ProductSaveReport, TaxonomyEntry};

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be sent or the response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status.
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `detail` or first field-level message from the body.
        message: String,
    },

    /// Backend rejected the bearer token. The session has been cleared.
    #[error("Session expired")]
    Unauthorized,

    /// No bearer token in the session.
    #[error("No access token - login required")]
    NotAuthenticated,

    /// Token endpoint rejected the username or password.
    #[error("Authentication failed: {0}")]
    InvalidCredentials(String),

    /// Access token payload could not be decoded.
    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Base URL or endpoint path is malformed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Text safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "No se pudo conectar con el servidor. Intente nuevamente.".to_owned(),
            Self::Status { message, .. } => message.clone(),
            Self::Unauthorized | Self::NotAuthenticated => {
                "Su sesión expiró. Inicie sesión nuevamente.".to_owned()
            }
            Self::InvalidCredentials(_) => "Usuario o contraseña incorrectos.".to_owned(),
            Self::InvalidToken(_) | Self::Parse(_) | Self::Url(_) => {
                "Respuesta inesperada del servidor.".to_owned()
            }
        }
    }

    /// Whether the caller must log in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::NotAuthenticated)
    }
}

/// Pull a user-facing message out of an error response body.
///
/// Prefers `detail`, then the first field-level error (`"campo: mensaje"`),
/// then the raw body. An empty body yields a generic status message.
#[must_use]
pub fn extract_error_message(status: u16, body: &str) -> String {
    use serde_json::Value;

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() {
            format!("Error {status} del servidor.")
        } else {
            trimmed.to_owned()
        };
    };

    match &value {
        Value::Object(map) => {
            if let Some(detail) = map.get("detail").and_then(first_text) {
                return detail;
            }
            if let Some(general) = map.get("non_field_errors").and_then(first_text) {
                return general;
            }
            map.iter()
                .find_map(|(field, v)| first_text(v).map(|msg| format!("{field}: {msg}")))
                .unwrap_or_else(|| value.to_string())
        }
        other => first_text(other).unwrap_or_else(|| other.to_string()),
    }
}

/// First string found in a value or (nested) array.
fn first_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 400,
            message: "quantity: No hay suficiente stock.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Backend returned 400: quantity: No hay suficiente stock."
        );
        assert_eq!(ApiError::Unauthorized.to_string(), "Session expired");
    }

    #[test]
    fn test_user_messages() {
        assert!(ApiError::Unauthorized.requires_login());
        assert!(!ApiError::InvalidCredentials("x".into()).requires_login());
        assert_eq!(
            ApiError::Status {
                status: 404,
                message: "No encontrado.".into()
            }
            .user_message(),
            "No encontrado."
        );
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_error_message(403, r#"{"detail": "No tiene permiso."}"#),
            "No tiene permiso."
        );
    }

    #[test]
    fn test_extract_field_error() {
        let body = r#"{"quantity": ["No hay suficiente stock. Disponible: 2, Intentado sacar: 5"]}"#;
        assert_eq!(
            extract_error_message(400, body),
            "quantity: No hay suficiente stock. Disponible: 2, Intentado sacar: 5"
        );
        assert_eq!(
            extract_error_message(400, r#"{"sku": "ya existe"}"#),
            "sku: ya existe"
        );
        assert_eq!(
            extract_error_message(400, r#"{"non_field_errors": ["Datos inválidos"]}"#),
            "Datos inválidos"
        );
    }

    #[test]
    fn test_extract_fallbacks() {
        assert_eq!(extract_error_message(502, ""), "Error 502 del servidor.");
        assert_eq!(extract_error_message(500, "Internal Server Error"), "Internal Server Error");
        assert_eq!(extract_error_message(400, r#"["uno", "dos"]"#), "uno");
        assert_eq!(extract_error_message(400, r#"{"count": 3}"#), r#"{"count":3}"#);
    }
}
