//! Contact form route handlers.
//!
//! Messages go to the backend's contact endpoint, with the user's token when
//! there is one and anonymously otherwise.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use bodega_core::client::AuthSession;
use bodega_core::draft::{CONTACT_SUBJECTS, ContactDraft};
use tracing::instrument;

use super::redirect_with;
use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::{CurrentUser, Flash, Nav, SelectOption};
use crate::state::AppState;

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub draft: ContactDraft,
    pub subjects: Vec<SelectOption>,
}

impl ContactTemplate {
    fn new(user: Option<&CurrentUser>, flash: Flash, draft: ContactDraft) -> Self {
        Self {
            nav: Nav::for_user(user),
            flash,
            subjects: CONTACT_SUBJECTS
                .iter()
                .map(|s| SelectOption::new(*s, *s, draft.subject.trim()))
                .collect(),
            draft,
        }
    }
}

/// Display the contact form.
pub async fn page(
    OptionalUser(user): OptionalUser,
    Query(flash): Query<Flash>,
) -> impl IntoResponse {
    ContactTemplate::new(user.as_ref(), flash, ContactDraft::default())
}

/// Send the contact form.
///
/// Invalid input re-renders the form with what the user typed.
#[instrument(skip_all, fields(subject = %draft.subject))]
pub async fn submit(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Form(draft): Form<ContactDraft>,
) -> Result<Response> {
    let message = match draft.validate() {
        Ok(message) => message,
        Err(e) => {
            let flash = Flash {
                error: Some(e.to_string()),
                ..Flash::default()
            };
            return Ok(ContactTemplate::new(user.as_ref(), flash, draft).into_response());
        }
    };

    let session = match &user {
        Some(user) => user.auth_session()?,
        None => AuthSession::anonymous(),
    };

    match state.api().submit_contact(&session, &message).await {
        Ok(()) => {
            tracing::info!("Contact message sent");
            Ok(redirect_with(
                "/contacto",
                &Flash::ok("Mensaje enviado. Nos pondremos en contacto pronto."),
            )
            .into_response())
        }
        Err(e) if e.requires_login() => Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Contact message rejected");
            let flash = Flash {
                error: Some(e.user_message()),
                ..Flash::default()
            };
            Ok(ContactTemplate::new(user.as_ref(), flash, draft).into_response())
        }
    }
}
