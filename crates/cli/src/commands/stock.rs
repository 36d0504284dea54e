//! `stock`: submit a stock movement.

use std::io::Write;

use bodega_core::draft::StockMovementDraft;
use bodega_core::{MovementType, ProductId};
use clap::Args;
use tracing::instrument;

use super::Context;
use crate::error::CliError;

/// Movement flags.
#[derive(Debug, Args)]
pub struct StockArgs {
    /// Product ID
    #[arg(long)]
    pub product: ProductId,

    /// `in`, `out` or `adjust`
    #[arg(long = "type")]
    pub movement_type: MovementType,

    /// Units moved (at least 1)
    #[arg(long, allow_negative_numbers = true)]
    pub quantity: i64,

    /// Reason recorded with the movement
    #[arg(long)]
    pub reason: String,
}

impl StockArgs {
    #[must_use]
    pub fn into_draft(self) -> StockMovementDraft {
        StockMovementDraft {
            product: self.product,
            quantity: self.quantity,
            movement_type: self.movement_type,
            reason: self.reason,
        }
    }
}

/// Validate and submit a movement, then print the product's new stock.
///
/// # Errors
///
/// Invalid input (nothing is sent), not logged in, or the backend
/// rejected the movement.
#[instrument(skip(ctx, draft, out), fields(product = %draft.product))]
pub async fn record(
    ctx: &Context,
    draft: &StockMovementDraft,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let movement = draft.validate()?;
    let session = ctx.tokens.session()?;

    ctx.api.create_movement(&session, &movement).await?;
    tracing::info!(
        kind = movement.movement_type.code(),
        quantity = movement.quantity,
        "Movement recorded"
    );
    writeln!(
        out,
        "Movimiento registrado: {} {} unidades.",
        movement.movement_type.label(),
        movement.quantity
    )?;

    let product = ctx.api.get_product(&session, movement.product).await?;
    writeln!(out, "Stock actual de {}: {}", product.nombre_comercial, product.stock)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::tests::{context, spawn_backend};
    use crate::token_file::tests::jwt;
    use bodega_core::client::AuthToken;
    use bodega_core::draft::DraftError;

    fn draft(quantity: i64) -> StockMovementDraft {
        StockMovementDraft {
            product: ProductId::new(1),
            quantity,
            movement_type: MovementType::Out,
            reason: "Venta".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_invalid_quantity_is_rejected_before_login_check() {
        let backend = spawn_backend().await;
        let ctx = context(&backend, "stock-invalid");
        let err = record(&ctx, &draft(0), &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, CliError::Draft(DraftError::QuantityTooSmall)));
    }

    #[tokio::test]
    async fn test_record_prints_new_stock() {
        let backend = spawn_backend().await;
        let ctx = context(&backend, "stock-ok");
        let token = AuthToken::new(jwt(r#"{"username":"a","role":"ADMIN"}"#), None).unwrap();
        ctx.tokens.save(&token).unwrap();

        let mut out = Vec::new();
        record(&ctx, &draft(2), &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Movimiento registrado: Salida (-) 2 unidades.\n"));
        assert!(text.ends_with("Stock actual de Mesa: 2\n"));
        ctx.tokens.remove().unwrap();
    }
}
