//! Products, product images and brand/category/provider endpoints.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::http::{ApiClient, Auth};
use super::{ApiError, AuthSession};
use crate::draft::{NewTaxonomyEntry, ProductPayload, TaxonomyKind};
use crate::gallery::{Gallery, ImageStep, NewImage};
use crate::models::{Brand, Category, Product, ProductImage, Provider};
use crate::types::{ImageId, ProductId};

/// A brand, category or provider as returned by a create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub id: i32,
    pub name: String,
}

/// Outcome of saving a product and then its images.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSaveReport {
    pub product: Product,
    /// Image steps attempted after the product was saved.
    pub image_steps: usize,
    /// Image steps that failed. Nothing is rolled back.
    pub failed_images: usize,
}

impl ProductSaveReport {
    /// Count-based warning when some image steps failed.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        (self.failed_images > 0).then(|| {
            format!(
                "Producto guardado, pero {} de {} operaciones de imagen fallaron.",
                self.failed_images, self.image_steps
            )
        })
    }
}

impl ApiClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// All products visible to the session's user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn list_products(&self, session: &AuthSession) -> Result<Vec<Product>, ApiError> {
        self.list_all(session, "api/products/", &[]).await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn get_product(
        &self,
        session: &AuthSession,
        id: ProductId,
    ) -> Result<Product, ApiError> {
        self.get_json(session, self.url(&format!("api/products/{id}/"))?)
            .await
    }

    /// `POST` a new product, or `PATCH` an existing one.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session, payload), fields(sku = %payload.sku))]
    pub async fn save_product(
        &self,
        session: &AuthSession,
        id: Option<ProductId>,
        payload: &ProductPayload,
    ) -> Result<Product, ApiError> {
        match id {
            Some(id) => {
                self.patch_json(session, &format!("api/products/{id}/"), payload)
                    .await
            }
            None => self.post_json(session, "api/products/", payload).await,
        }
    }

    /// Save the product, then run the gallery plan in order.
    ///
    /// Failure to save the product itself is an error. Image step failures
    /// are counted in the report, except a `401`, which ends the sequence.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the product save fails or the session expires.
    #[instrument(skip(self, session, payload, gallery), fields(sku = %payload.sku))]
    pub async fn save_product_with_images(
        &self,
        session: &AuthSession,
        id: Option<ProductId>,
        payload: &ProductPayload,
        gallery: &Gallery,
    ) -> Result<ProductSaveReport, ApiError> {
        let product = self.save_product(session, id, payload).await?;

        let plan = gallery.plan();
        let mut failed_images = 0;
        for step in &plan {
            let result = match step {
                ImageStep::SetPrincipal { id, is_principal } => {
                    self.set_image_principal(session, *id, *is_principal).await.map(|_| ())
                }
                ImageStep::Upload {
                    image,
                    is_principal,
                } => self
                    .upload_image(session, product.id, image, *is_principal)
                    .await
                    .map(|_| ()),
            };
            match result {
                Ok(()) => {}
                Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
                Err(e) => {
                    warn!(error = %e, product_id = %product.id, "Image step failed");
                    failed_images += 1;
                }
            }
        }

        info!(product_id = %product.id, steps = plan.len(), failed_images, "Product saved");
        Ok(ProductSaveReport {
            product,
            image_steps: plan.len(),
            failed_images,
        })
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn delete_product(
        &self,
        session: &AuthSession,
        id: ProductId,
    ) -> Result<(), ApiError> {
        self.delete(session, &format!("api/products/{id}/")).await
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Images attached to a product.
    ///
    /// The backend's image search matches ids as substrings, so results are
    /// filtered to the exact product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn list_images(
        &self,
        session: &AuthSession,
        product: ProductId,
    ) -> Result<Vec<ProductImage>, ApiError> {
        let images: Vec<ProductImage> = self
            .list_all(session, "api/product-images/", &[("search", product.to_string())])
            .await?;
        Ok(images
            .into_iter()
            .filter(|img| img.product.is_none_or(|p| p == product))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn set_image_principal(
        &self,
        session: &AuthSession,
        id: ImageId,
        is_principal: bool,
    ) -> Result<ProductImage, ApiError> {
        self.patch_json(
            session,
            &format!("api/product-images/{id}/"),
            &json!({ "is_principal": is_principal }),
        )
        .await
    }

    /// Multipart upload of one image.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(
        skip(self, session, image),
        fields(file = %image.file_name, size = image.bytes.len())
    )]
    pub async fn upload_image(
        &self,
        session: &AuthSession,
        product: ProductId,
        image: &NewImage,
        is_principal: bool,
    ) -> Result<ProductImage, ApiError> {
        let part = reqwest::multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("product", product.to_string())
            .text("is_principal", if is_principal { "true" } else { "false" });

        let request = self
            .http()
            .post(self.url("api/product-images/")?)
            .multipart(form);
        let response = self.send(session, request, Auth::Required).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session))]
    pub async fn delete_image(&self, session: &AuthSession, id: ImageId) -> Result<(), ApiError> {
        self.delete(session, &format!("api/product-images/{id}/")).await
    }

    // =========================================================================
    // Taxonomy
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    pub async fn list_brands(&self, session: &AuthSession) -> Result<Vec<Brand>, ApiError> {
        self.list_taxonomy(session, TaxonomyKind::Brand).await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    pub async fn list_categories(&self, session: &AuthSession) -> Result<Vec<Category>, ApiError> {
        self.list_taxonomy(session, TaxonomyKind::Category).await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    pub async fn list_providers(&self, session: &AuthSession) -> Result<Vec<Provider>, ApiError> {
        self.list_taxonomy(session, TaxonomyKind::Provider).await
    }

    #[instrument(skip(self, session))]
    async fn list_taxonomy<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        kind: TaxonomyKind,
    ) -> Result<Vec<T>, ApiError> {
        self.list_all(session, &format!("api/{}/", kind.endpoint()), &[])
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response.
    #[instrument(skip(self, session, entry), fields(name = %entry.name))]
    pub async fn create_taxonomy(
        &self,
        session: &AuthSession,
        kind: TaxonomyKind,
        entry: &NewTaxonomyEntry,
    ) -> Result<TaxonomyEntry, ApiError> {
        self.post_json(session, &format!("api/{}/", kind.endpoint()), entry)
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError` on network failure or a non-2xx response; the
    /// backend refuses to delete entries still referenced by products.
    #[instrument(skip(self, session))]
    pub async fn delete_taxonomy(
        &self,
        session: &AuthSession,
        kind: TaxonomyKind,
        id: i32,
    ) -> Result<(), ApiError> {
        self.delete(session, &format!("api/{}/{id}/", kind.endpoint()))
            .await
    }
}
