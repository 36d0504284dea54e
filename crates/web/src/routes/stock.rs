//! Stock movement and forecast route handlers.
//!
//! The backend applies each movement to the product's stock and rejects
//! outgoing quantities larger than what is on hand; its message is shown
//! as is.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use bodega_core::ProductId;
use bodega_core::draft::StockMovementDraft;
use bodega_core::models::{Product, StockMovement};
use bodega_core::types::MovementType;
use chrono::FixedOffset;
use serde::Deserialize;
use tracing::instrument;

use super::redirect_with;
use crate::error::Result;
use crate::filters;
use crate::middleware::{Authorized, gates};
use crate::models::{CurrentUser, Flash, Nav, SelectOption};
use crate::state::AppState;

/// Timestamp format shared by movement and history tables.
pub const DATE_FORMAT: &str = "%d-%m-%Y, %H:%M:%S";

/// Movement form as posted. Quantity stays text so a blank or non-numeric
/// value gets the same message as zero.
#[derive(Debug, Deserialize)]
pub struct MovementForm {
    #[serde(default)]
    pub quantity: String,
    pub movement_type: MovementType,
    #[serde(default)]
    pub reason: String,
}

impl MovementForm {
    #[must_use]
    pub fn into_draft(self, product: ProductId) -> StockMovementDraft {
        StockMovementDraft {
            product,
            quantity: self.quantity.trim().parse().unwrap_or(0),
            movement_type: self.movement_type,
            reason: self.reason,
        }
    }
}

/// One row of the recent movements table.
#[derive(Debug, Clone)]
pub struct MovementRow {
    pub date: String,
    pub kind: &'static str,
    pub quantity: i64,
    pub reason: String,
    pub user: String,
}

impl MovementRow {
    fn new(movement: &StockMovement, tz: &FixedOffset) -> Self {
        Self {
            date: movement
                .created_at
                .map(|d| d.with_timezone(tz).format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            kind: movement.movement_type.label(),
            quantity: movement.quantity,
            reason: movement.reason.clone(),
            user: movement
                .user
                .map_or_else(|| "Sistema".to_owned(), |id| format!("Admin #{id}")),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Stock movement page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/stock.html")]
pub struct StockTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub stock: i64,
    pub quantity: String,
    pub reason: String,
    pub movement_types: Vec<SelectOption>,
    pub movements: Vec<MovementRow>,
}

impl StockTemplate {
    fn new(
        user: &CurrentUser,
        product: &Product,
        draft: &StockMovementDraft,
        movements: &[StockMovement],
        tz: &FixedOffset,
    ) -> Self {
        Self {
            nav: Nav::for_user(Some(user)),
            flash: Flash::default(),
            product_id: product.id,
            product_name: product.nombre_comercial.clone(),
            sku: product.sku.clone(),
            stock: product.stock,
            quantity: draft.quantity.to_string(),
            reason: draft.reason.clone(),
            movement_types: MovementType::ALL
                .iter()
                .map(|t| SelectOption::new(t.code(), t.label(), draft.movement_type.code()))
                .collect(),
            movements: movements.iter().map(|m| MovementRow::new(m, tz)).collect(),
        }
    }
}

/// Forecast page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/forecast.html")]
pub struct ForecastTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub product_id: ProductId,
    pub product_name: String,
    pub stock: i64,
    pub entries: Vec<(String, String)>,
}

// =============================================================================
// Routes
// =============================================================================

/// Display the movement form with the product's recent movements.
#[instrument(skip(state, user, flash), fields(username = %user.username))]
pub async fn page(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::RecordStockMovement>,
    Path(id): Path<ProductId>,
    Query(flash): Query<Flash>,
) -> Result<impl IntoResponse> {
    let session = user.auth_session()?;
    let (product, movements) = tokio::try_join!(
        state.api().get_product(&session, id),
        state.api().list_movements(&session, Some(id)),
    )?;

    let draft = StockMovementDraft::for_product(id);
    let tz = state.config().timezone();
    let mut template = StockTemplate::new(&user, &product, &draft, &movements, &tz);
    template.flash = flash;
    Ok(template)
}

/// Record a movement.
///
/// Rejections re-render the form with the submitted values and the
/// backend's message.
#[instrument(skip(state, user, form), fields(username = %user.username))]
pub async fn record(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::RecordStockMovement>,
    Path(id): Path<ProductId>,
    Form(form): Form<MovementForm>,
) -> Result<Response> {
    let session = user.auth_session()?;
    let draft = form.into_draft(id);

    let error = match draft.validate() {
        Ok(movement) => match state.api().create_movement(&session, &movement).await {
            Ok(_) => {
                let message = format!(
                    "Movimiento registrado: {} {} unidades.",
                    movement.movement_type.label(),
                    movement.quantity
                );
                return Ok(redirect_with(
                    &format!("/admin/productos/{id}/stock"),
                    &Flash::ok(&message),
                )
                .into_response());
            }
            Err(e) if e.requires_login() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Stock movement rejected");
                e.user_message()
            }
        },
        Err(e) => e.to_string(),
    };

    let (product, movements) = tokio::try_join!(
        state.api().get_product(&session, id),
        state.api().list_movements(&session, Some(id)),
    )?;
    let tz = state.config().timezone();
    let mut template = StockTemplate::new(&user, &product, &draft, &movements, &tz);
    template.flash.error = Some(error);
    Ok(template.into_response())
}

/// Display the restock forecast.
#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn forecast(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ViewForecast>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let session = user.auth_session()?;
    let (product, forecast) = tokio::try_join!(
        state.api().get_product(&session, id),
        state.api().forecast(&session, id),
    )?;

    Ok(ForecastTemplate {
        nav: Nav::for_user(Some(&user)),
        flash: Flash::default(),
        product_id: id,
        product_name: product.nombre_comercial,
        stock: product.stock,
        entries: forecast.entries(),
    })
}
