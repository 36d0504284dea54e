//! Audit history route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use bodega_core::ProductId;
use bodega_core::audit::{self, AuditEntry, FieldChange};
use chrono::FixedOffset;
use serde::Deserialize;
use tracing::instrument;

use super::stock::DATE_FORMAT;
use crate::error::Result;
use crate::filters;
use crate::middleware::{Authorized, gates};
use crate::models::{Flash, Nav};
use crate::state::AppState;

/// History query string.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// Only show this product's snapshots.
    #[serde(default)]
    pub producto: Option<String>,
}

impl HistoryParams {
    fn product(&self) -> Option<ProductId> {
        self.producto.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

/// One history row.
#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub date: String,
    pub kind_label: String,
    pub kind_variant: &'static str,
    pub product_id: ProductId,
    pub product_name: String,
    pub actor: String,
    /// Summary for creation, status flips and no-change rows.
    pub summary: Option<&'static str>,
    pub changes: Vec<FieldChange>,
}

impl HistoryRow {
    fn new(entry: &AuditEntry<'_>, tz: &FixedOffset) -> Self {
        let snapshot = entry.snapshot;
        Self {
            date: snapshot
                .history_date
                .with_timezone(tz)
                .format(DATE_FORMAT)
                .to_string(),
            kind_label: snapshot.history_type.label().to_owned(),
            kind_variant: snapshot.history_type.variant(),
            product_id: snapshot.id,
            product_name: snapshot.nombre_comercial.trimmed().to_owned(),
            actor: snapshot.actor(),
            summary: entry.outcome.label(),
            changes: entry.outcome.changes().to_vec(),
        }
    }
}

/// History page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/history.html")]
pub struct HistoryTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub rows: Vec<HistoryRow>,
    pub product_filter: Option<ProductId>,
}

/// Display the audit history, newest first.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn index(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ViewHistory>,
    Query(params): Query<HistoryParams>,
    Query(flash): Query<Flash>,
) -> Result<impl IntoResponse> {
    let session = user.auth_session()?;
    let history = state.api().list_history(&session).await?;

    let product = params.product();
    let tz = state.config().timezone();
    let rows = audit::render_all(&history)
        .iter()
        .filter(|entry| product.is_none_or(|id| entry.snapshot.id == id))
        .map(|entry| HistoryRow::new(entry, &tz))
        .collect();

    Ok(HistoryTemplate {
        nav: Nav::for_user(Some(&user)),
        flash,
        rows,
        product_filter: product,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use bodega_core::models::HistorySnapshot;
    use serde_json::json;

    fn history() -> Vec<HistorySnapshot> {
        serde_json::from_value(json!([
            {
                "history_id": 3, "history_date": "2024-03-02T13:00:00Z", "history_type": "~",
                "history_user_id": 1, "id": 7, "nombre_comercial": "Mesa",
                "precio_venta": "15000.00", "stock": 4, "is_active": true
            },
            {
                "history_id": 2, "history_date": "2024-03-01T12:00:00Z", "history_type": "+",
                "id": 8, "nombre_comercial": "Silla", "precio_venta": "5000.00", "stock": 1
            },
            {
                "history_id": 1, "history_date": "2024-03-01T10:00:00Z", "history_type": "+",
                "history_user_id": 1, "id": 7, "nombre_comercial": "Mesa",
                "precio_venta": "12000.00", "stock": 4, "is_active": true
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_rows_carry_diff_and_local_time() {
        let history = history();
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        let entries = audit::render_all(&history);

        let update = HistoryRow::new(&entries[0], &tz);
        assert_eq!(update.date, "02-03-2024, 10:00:00");
        assert_eq!(update.kind_label, "Modificación");
        assert_eq!(update.actor, "Admin #1");
        assert_eq!(update.summary, None);
        assert_eq!(update.changes.len(), 1);
        assert_eq!(update.changes[0].label(), "Precio");
        assert_eq!(update.changes[0].before, "$12.000");
        assert_eq!(update.changes[0].after, "$15.000");

        let created = HistoryRow::new(&entries[1], &tz);
        assert_eq!(created.summary, Some("Creación inicial"));
        assert_eq!(created.actor, "Sistema");
    }

    #[test]
    fn test_product_param() {
        let params = HistoryParams {
            producto: Some(" 7 ".to_owned()),
        };
        assert_eq!(params.product(), Some(ProductId::new(7)));
        assert_eq!(HistoryParams::default().product(), None);
        let bad = HistoryParams {
            producto: Some("mesa".to_owned()),
        };
        assert_eq!(bad.product(), None);
    }
}
