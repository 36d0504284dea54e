//! Stock movements, product history, PIM sheets and forecasts.

use tracing::{info, instrument};

use super::http::{ApiClient, Auth};
use super::{ApiError, AuthSession};
use crate::draft::NewStockMovement;
use crate::models::{Forecast, HistorySnapshot, StockMovement};
use crate::types::ProductId;

/// A downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ApiClient {
    /// Stock movements, optionally for one product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn list_movements(
        &self,
        session: &AuthSession,
        product: Option<ProductId>,
    ) -> Result<Vec<StockMovement>, ApiError> {
        let query: Vec<(&str, String)> = product
            .map(|id| ("product", id.to_string()))
            .into_iter()
            .collect();
        let movements: Vec<StockMovement> =
            self.list_all(session, "api/stock-movements/", &query).await?;
        Ok(match product {
            Some(id) => movements.into_iter().filter(|m| m.product == id).collect(),
            None => movements,
        })
    }

    /// Record a movement. The backend applies it to the stock and rejects
    /// outgoing quantities larger than the stock on hand.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(
        skip(self, session, movement),
        fields(product_id = %movement.product, kind = %movement.movement_type)
    )]
    pub async fn create_movement(
        &self,
        session: &AuthSession,
        movement: &NewStockMovement,
    ) -> Result<StockMovement, ApiError> {
        let created: StockMovement = self
            .post_json(session, "api/stock-movements/", movement)
            .await?;
        info!(movement_id = %created.id, quantity = movement.quantity, "Stock movement recorded");
        Ok(created)
    }

    /// Every product snapshot, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn list_history(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<HistorySnapshot>, ApiError> {
        self.list_all(session, "api/product-history/", &[]).await
    }

    /// Download the product information sheet.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn pim_sheet(
        &self,
        session: &AuthSession,
        id: ProductId,
    ) -> Result<Document, ApiError> {
        let request = self
            .http()
            .get(self.url(&format!("api/products/{id}/pim-sheet/"))?);
        let response = self.send(session, request, Auth::Required).await?;

        let headers = response.headers();
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/pdf")
            .to_owned();
        let file_name = headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name)
            .unwrap_or_else(|| format!("ficha-{id}.pdf"));

        let bytes = response.bytes().await?.to_vec();
        Ok(Document {
            content_type,
            file_name,
            bytes,
        })
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn forecast(
        &self,
        session: &AuthSession,
        id: ProductId,
    ) -> Result<Forecast, ApiError> {
        self.get_json(session, self.url(&format!("api/products/{id}/forecast/"))?)
            .await
    }
}

/// `filename` parameter of a `Content-Disposition` header.
fn disposition_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("filename"))
        .map(|(_, value)| value.trim().trim_matches('"').to_owned())
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
}
