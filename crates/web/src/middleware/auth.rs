//! Authentication and role-gating extractors.
//!
//! Every gated handler names the permission it needs through a marker type:
//!
//! ```rust,ignore
//! async fn products_page(
//!     Authorized(user, ..): Authorized<gates::ManageProducts>,
//! ) -> impl IntoResponse {
//!     format!("Hola, {}!", user.username)
//! }
//! ```
//!
//! The check itself is [`bodega_core::authorize`], the same function the
//! templates consult to show or hide navigation and buttons.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use bodega_core::{Permission, authorize};
use tower_sessions::Session;

use crate::error::{EXPIRED_LOGIN_PATH, SessionExpired};
use crate::models::{CurrentUser, keys};

/// A permission required by a route.
pub trait Gate {
    const PERMISSION: Permission;
}

/// Marker types naming each permission.
pub mod gates {
    use super::{Gate, Permission};

    macro_rules! gate {
        ($($name:ident),* $(,)?) => {
            $(
                #[derive(Debug, Clone, Copy)]
                pub struct $name;

                impl Gate for $name {
                    const PERMISSION: Permission = Permission::$name;
                }
            )*
        };
    }

    gate!(
        ViewCatalog,
        ManageProducts,
        ManageTaxonomy,
        RecordStockMovement,
        ViewHistory,
        DownloadPimSheet,
        ViewForecast,
    );
}

/// Extractor that requires a logged-in user whose role grants `G`.
pub struct Authorized<G: Gate>(pub CurrentUser, pub PhantomData<G>);

/// Why a gated request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Not logged in.
    RedirectToLogin,
    /// The stored token has expired or cannot be decoded.
    Expired,
    /// Logged in, but the role lacks the permission.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Expired => {
                let mut response = Redirect::to(EXPIRED_LOGIN_PATH).into_response();
                response.extensions_mut().insert(SessionExpired);
                response
            }
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "No tiene permisos para acceder a esta sección.",
            )
                .into_response(),
        }
    }
}

impl<S, G> FromRequestParts<S> for Authorized<G>
where
    S: Send + Sync,
    G: Gate,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)
            .await
            .ok_or(AuthRejection::RedirectToLogin)?;

        match user.token() {
            Ok(token) if !token.is_expired() => {}
            _ => return Err(AuthRejection::Expired),
        }

        if !authorize(user.role, G::PERMISSION) {
            tracing::warn!(
                username = %user.username,
                role = %user.role,
                permission = ?G::PERMISSION,
                "Permission denied"
            );
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(user, PhantomData))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike [`Authorized`], this does not reject the request if nobody is
/// logged in.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Helper to set the current user in the session.
///
/// Cycles the session id first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to end the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
