//! Authentication route handlers.
//!
//! Login exchanges username and password for a backend token pair and keeps
//! it in the server-side session. There is no local user store.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bodega_core::client::ApiError;
use bodega_core::{Permission, Role};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Flash, Nav};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Query parameters for the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    /// Set when the backend rejected the previous token.
    pub expired: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub expired: bool,
    pub username: String,
}

// =============================================================================
// Routes
// =============================================================================

/// Where a user lands after logging in.
#[must_use]
pub const fn landing_path(role: Role) -> &'static str {
    if role.can(Permission::ManageProducts) {
        "/admin/productos"
    } else {
        "/catalogo"
    }
}

/// Display the login page.
pub async fn login_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<LoginQuery>,
) -> Response {
    if let Some(user) = user {
        return Redirect::to(landing_path(user.role)).into_response();
    }

    LoginTemplate {
        nav: Nav::for_user(None),
        flash: Flash {
            ok: None,
            error: query.error,
        },
        expired: query.expired.is_some(),
        username: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim().to_owned();
    let render_error = |message: String| {
        LoginTemplate {
            nav: Nav::for_user(None),
            flash: Flash {
                ok: None,
                error: Some(message),
            },
            expired: false,
            username: username.clone(),
        }
        .into_response()
    };

    if username.is_empty() || form.password.is_empty() {
        return render_error("Ingrese usuario y contraseña.".to_owned());
    }

    let password = SecretString::from(form.password);
    let token = match state.api().obtain_token(&username, &password).await {
        Ok(token) => token,
        Err(e @ ApiError::InvalidCredentials(_)) => {
            tracing::warn!("Login failed: invalid credentials");
            return render_error(e.user_message());
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            return render_error(e.user_message());
        }
    };

    let user = CurrentUser::from_token(&token);
    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!(error = %e, "Failed to set session");
        return render_error("No se pudo iniciar la sesión. Intente nuevamente.".to_owned());
    }

    set_sentry_user(&user.username);
    tracing::info!(role = %user.role, "User logged in");
    Redirect::to(landing_path(user.role)).into_response()
}

/// End the session.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();
    Redirect::to("/").into_response()
}
