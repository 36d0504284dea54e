//! Brand, category and provider route handlers.
//!
//! All three share one pair of routes keyed by the URL segment
//! (`marcas`, `categorias`, `proveedores`). Results are reported on the
//! product table page, where the management panels live.

use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use bodega_core::draft::{TaxonomyDraft, TaxonomyKind};
use tracing::instrument;

use super::redirect_with;
use crate::error::{AppError, Result};
use crate::middleware::{Authorized, gates};
use crate::models::Flash;
use crate::state::AppState;

const BACK: &str = "/admin/productos";

fn parse_kind(segment: &str) -> Result<TaxonomyKind> {
    segment
        .parse()
        .map_err(|_| AppError::NotFound(format!("sección {segment}")))
}

/// Create a brand, category or provider.
#[instrument(skip(state, user, draft), fields(username = %user.username))]
pub async fn create(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageTaxonomy>,
    Path(kind): Path<String>,
    Form(draft): Form<TaxonomyDraft>,
) -> Result<Response> {
    let kind = parse_kind(&kind)?;
    let entry = match draft.validate() {
        Ok(entry) => entry,
        Err(e) => return Ok(redirect_with(BACK, &Flash::error(&e.to_string())).into_response()),
    };

    let session = user.auth_session()?;
    match state.api().create_taxonomy(&session, kind, &entry).await {
        Ok(created) => {
            tracing::info!(kind = kind.endpoint(), id = created.id, "Taxonomy entry created");
            let message = format!("Registro creado: {} \"{}\".", kind.label(), created.name);
            Ok(redirect_with(BACK, &Flash::ok(&message)).into_response())
        }
        Err(e) if e.requires_login() => Err(e.into()),
        Err(e) => Ok(redirect_with(BACK, &Flash::error(&e.user_message())).into_response()),
    }
}

/// Delete a brand, category or provider.
///
/// The backend refuses entries still referenced by products; its message is
/// shown.
#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn delete(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageTaxonomy>,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<Response> {
    let kind = parse_kind(&kind)?;
    let session = user.auth_session()?;
    match state.api().delete_taxonomy(&session, kind, id).await {
        Ok(()) => {
            tracing::info!(kind = kind.endpoint(), id, "Taxonomy entry deleted");
            let message = format!("Registro eliminado: {}.", kind.label());
            Ok(redirect_with(BACK, &Flash::ok(&message)).into_response())
        }
        Err(e) if e.requires_login() => Err(e.into()),
        Err(e) => Ok(redirect_with(BACK, &Flash::error(&e.user_message())).into_response()),
    }
}
