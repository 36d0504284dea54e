//! Session middleware configuration.
//!
//! Sessions live in server memory through tower-sessions; the cookie only
//! carries the session id. Restarting the server logs everyone out.

use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::WebConfig;
use crate::error::SessionExpired;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bodega_session";

/// Session expiry time in seconds (8 hours of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 8 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &WebConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Drop the whole session when a handler reports that the backend rejected
/// its token.
pub async fn expire_session_middleware(session: Session, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.extensions().get::<SessionExpired>().is_some() {
        if let Err(e) = session.flush().await {
            tracing::error!(error = %e, "Failed to flush expired session");
        }
        crate::error::clear_sentry_user();
    }
    response
}
