//! `history`: product changes with field-level diffs.

use std::io::Write;

use bodega_core::ProductId;
use bodega_core::audit::{self, AuditEntry};
use chrono::FixedOffset;
use tracing::instrument;

use super::Context;
use crate::error::CliError;

const DATE_FORMAT: &str = "%d-%m-%Y, %H:%M:%S";

/// Print the history, newest first, optionally for one product.
///
/// # Errors
///
/// Not logged in, or the backend call failed. A 401 also removes the
/// token file.
#[instrument(skip(ctx, out))]
pub async fn show(
    ctx: &Context,
    product: Option<ProductId>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let session = ctx.tokens.session()?;
    let history = ctx.api.list_history(&session).await?;

    let entries: Vec<AuditEntry<'_>> = audit::render_all(&history)
        .into_iter()
        .filter(|entry| product.is_none_or(|id| entry.snapshot.id == id))
        .collect();
    write_entries(&entries, &ctx.tz, out)?;
    Ok(())
}

fn write_entries(
    entries: &[AuditEntry<'_>],
    tz: &FixedOffset,
    out: &mut impl Write,
) -> std::io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "No hay cambios registrados.");
    }
    for entry in entries {
        let snapshot = entry.snapshot;
        writeln!(
            out,
            "{}  {:<13} #{} {}  ({})",
            snapshot.history_date.with_timezone(tz).format(DATE_FORMAT),
            snapshot.history_type.label(),
            snapshot.id,
            snapshot.nombre_comercial.trimmed(),
            snapshot.actor(),
        )?;
        if let Some(summary) = entry.outcome.label() {
            writeln!(out, "    {summary}")?;
        }
        for change in entry.outcome.changes() {
            writeln!(out, "    {}: {} → {}", change.label(), change.before, change.after)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::tests::{context, spawn_backend};
    use crate::token_file::tests::jwt;
    use bodega_core::client::AuthToken;
    use bodega_core::models::HistorySnapshot;
    use serde_json::json;

    #[test]
    fn test_write_entries() {
        let history: Vec<HistorySnapshot> = serde_json::from_value(json!([
            {
                "history_id": 2, "history_date": "2024-03-02T13:00:00Z", "history_type": "~",
                "history_user_id": 1, "id": 7, "nombre_comercial": "Mesa",
                "precio_venta": "15000.00", "stock": 4, "is_active": true
            },
            {
                "history_id": 1, "history_date": "2024-03-01T10:00:00Z", "history_type": "+",
                "id": 7, "nombre_comercial": "Mesa",
                "precio_venta": "12000.00", "stock": 4, "is_active": true
            }
        ]))
        .unwrap();
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();

        let mut out = Vec::new();
        write_entries(&audit::render_all(&history), &tz, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("02-03-2024, 10:00:00  Modificación"));
        assert!(lines[0].ends_with("#7 Mesa  (Admin #1)"));
        assert_eq!(lines[1], "    Precio: $12.000 → $15.000");
        assert!(lines[2].ends_with("(Sistema)"));
        assert_eq!(lines[3], "    Creación inicial");
    }

    #[test]
    fn test_empty_history() {
        let mut out = Vec::new();
        write_entries(&[], &FixedOffset::east_opt(0).unwrap(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No hay cambios registrados.\n");
    }

    #[tokio::test]
    async fn test_rejected_token_removes_token_file() {
        let backend = spawn_backend().await;
        let ctx = context(&backend, "history-401");
        let token = AuthToken::new(jwt(r#"{"username":"a","role":"ADMIN"}"#), None).unwrap();
        ctx.tokens.save(&token).unwrap();

        let err = show(&ctx, None, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, CliError::Api(ref e) if e.requires_login()));
        assert!(!ctx.tokens.path().exists());
    }
}
