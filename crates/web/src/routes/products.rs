//! Product administration route handlers.
//!
//! Create and edit forms are multipart: text fields become a
//! [`ProductDraft`], file fields become [`NewImage`]s, and the `principal`
//! radio picks the principal image. Saving runs the product write followed
//! by the gallery plan; image failures are reported, not rolled back.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    response::{IntoResponse, Response},
};
use bodega_core::client::{ApiClient, ApiError, AuthSession};
use bodega_core::draft::{ProductDraft, TaxonomyKind};
use bodega_core::gallery::{Gallery, GalleryError, MAX_IMAGES, NewImage, Preview, Principal};
use bodega_core::models::{Brand, Category, Product, Provider};
use bodega_core::{ImageId, Permission, ProductId};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use super::redirect_with;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Authorized, gates};
use crate::models::{CurrentUser, Flash, Nav, SelectOption};
use crate::state::AppState;

/// Multipart field carrying image files.
pub const IMAGES_FIELD: &str = "imagenes";

/// Multipart field carrying the principal image choice.
pub const PRINCIPAL_FIELD: &str = "principal";

// =============================================================================
// Taxonomy
// =============================================================================

/// Brands, categories and providers, as offered by the product form.
#[derive(Debug, Clone, Default)]
pub struct Taxonomies {
    pub brands: Vec<Brand>,
    pub categories: Vec<Category>,
    pub providers: Vec<Provider>,
}

impl Taxonomies {
    /// Fetch all three lists concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first backend error.
    pub async fn load(
        api: &ApiClient,
        session: &AuthSession,
    ) -> std::result::Result<Self, ApiError> {
        let (brands, categories, providers) = tokio::try_join!(
            api.list_brands(session),
            api.list_categories(session),
            api.list_providers(session),
        )?;
        Ok(Self {
            brands,
            categories,
            providers,
        })
    }

    fn rows(&self, kind: TaxonomyKind) -> Vec<TaxonomyRow> {
        let row = |id: i32, name: &str| TaxonomyRow {
            id,
            name: name.to_owned(),
        };
        match kind {
            TaxonomyKind::Brand => self
                .brands
                .iter()
                .map(|b| row(b.id.as_i32(), &b.name))
                .collect(),
            TaxonomyKind::Category => self
                .categories
                .iter()
                .map(|c| row(c.id.as_i32(), &c.name))
                .collect(),
            TaxonomyKind::Provider => self
                .providers
                .iter()
                .map(|p| row(p.id.as_i32(), &p.name))
                .collect(),
        }
    }

    fn panels(&self) -> Vec<TaxonomyPanel> {
        TaxonomyKind::ALL
            .iter()
            .map(|&kind| TaxonomyPanel {
                label: kind.label(),
                slug: kind.slug(),
                entries: self.rows(kind),
            })
            .collect()
    }
}

/// One brand, category or provider in a management panel.
#[derive(Debug, Clone)]
pub struct TaxonomyRow {
    pub id: i32,
    pub name: String,
}

/// Management panel for one taxonomy kind.
#[derive(Debug, Clone)]
pub struct TaxonomyPanel {
    pub label: &'static str,
    pub slug: &'static str,
    pub entries: Vec<TaxonomyRow>,
}

/// `<option>`s for a taxonomy `<select>`, with a leading empty choice.
fn options<'a>(
    entries: impl Iterator<Item = (i32, &'a str)>,
    current: Option<i32>,
) -> Vec<SelectOption> {
    let current = current.map(|id| id.to_string()).unwrap_or_default();
    std::iter::once(SelectOption::new("", "Seleccione...", &current))
        .chain(entries.map(|(id, name)| SelectOption::new(id.to_string(), name, &current)))
        .collect()
}

// =============================================================================
// View Types
// =============================================================================

/// One row of the admin product table.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub brand: String,
    pub category: String,
    pub provider: String,
    pub price: String,
    pub cost: String,
    pub stock: i64,
    pub stock_variant: &'static str,
    pub is_active: bool,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.nombre_comercial.clone(),
            sku: product.sku.clone(),
            brand: product.brand_name().to_owned(),
            category: product.category_name().to_owned(),
            provider: product.provider_name().to_owned(),
            price: product.price().to_string(),
            cost: product.cost().map(|c| c.to_string()).unwrap_or_default(),
            stock: product.stock,
            stock_variant: product.stock_status().variant(),
            is_active: product.is_active,
        }
    }
}

/// A thumbnail in the form's image picker.
#[derive(Debug, Clone)]
pub struct ImageChoice {
    /// Radio value, e.g. `existing:4`.
    pub value: String,
    pub image_id: Option<ImageId>,
    pub url: Option<String>,
    pub label: String,
    pub is_principal: bool,
}

impl From<Preview> for ImageChoice {
    fn from(preview: Preview) -> Self {
        let image_id = match preview.principal {
            Principal::Existing(id) => Some(id),
            Principal::New(_) => None,
        };
        Self {
            value: preview.principal.to_string(),
            image_id,
            url: preview.url,
            label: preview.label,
            is_principal: preview.is_principal,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Product table template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub products: Vec<ProductRow>,
    pub panels: Vec<TaxonomyPanel>,
    pub can_manage_taxonomy: bool,
    pub can_record_stock: bool,
    pub can_view_forecast: bool,
}

/// Create/edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub title: String,
    pub action: String,
    pub product_id: Option<ProductId>,
    pub draft: ProductDraft,
    /// Decimal inputs as typed, since the draft keeps them parsed.
    pub precio_venta: String,
    pub costo_cg: String,
    pub peso: String,
    pub rating: String,
    pub brands: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
    pub providers: Vec<SelectOption>,
    pub images: Vec<ImageChoice>,
    pub remaining_slots: usize,
    pub max_images: usize,
}

impl ProductFormTemplate {
    fn new(
        user: &CurrentUser,
        product_id: Option<ProductId>,
        draft: ProductDraft,
        taxonomies: &Taxonomies,
        gallery: &Gallery,
    ) -> Self {
        let (title, action) = match product_id {
            Some(id) => (format!("Editar producto #{id}"), format!("/admin/productos/{id}")),
            None => ("Nuevo producto".to_owned(), "/admin/productos".to_owned()),
        };
        Self {
            nav: Nav::for_user(Some(user)),
            flash: Flash::default(),
            title,
            action,
            product_id,
            precio_venta: decimal_input(draft.precio_venta),
            costo_cg: decimal_input(draft.costo_cg),
            peso: decimal_input(draft.peso),
            rating: decimal_input(draft.rating),
            brands: options(
                taxonomies.brands.iter().map(|b| (b.id.as_i32(), b.name.as_str())),
                draft.brand_id.map(|id| id.as_i32()),
            ),
            categories: options(
                taxonomies
                    .categories
                    .iter()
                    .map(|c| (c.id.as_i32(), c.name.as_str())),
                draft.category_id.map(|id| id.as_i32()),
            ),
            providers: options(
                taxonomies
                    .providers
                    .iter()
                    .map(|p| (p.id.as_i32(), p.name.as_str())),
                draft.provider_id.map(|id| id.as_i32()),
            ),
            draft,
            images: gallery.previews().into_iter().map(ImageChoice::from).collect(),
            remaining_slots: gallery.remaining(),
            max_images: MAX_IMAGES,
        }
    }

    fn with_error(mut self, message: String) -> Self {
        self.flash.error = Some(message);
        self
    }
}

fn decimal_input(amount: Option<rust_decimal::Decimal>) -> String {
    amount.map(|d| d.normalize().to_string()).unwrap_or_default()
}

// =============================================================================
// Form Parsing
// =============================================================================

/// A parsed create/edit submission.
#[derive(Debug, Default)]
pub struct ProductSubmission {
    pub draft: ProductDraft,
    pub files: Vec<NewImage>,
    pub principal: Option<Principal>,
}

fn bad_multipart(e: &MultipartError) -> AppError {
    AppError::BadRequest(format!("Formulario inválido: {}", e.body_text()))
}

/// Read every multipart field. Empty file inputs are skipped.
async fn read_submission(mut multipart: Multipart) -> Result<ProductSubmission> {
    let mut fields = Map::new();
    let mut files = Vec::new();
    let mut principal = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| bad_multipart(&e))? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            IMAGES_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(|e| bad_multipart(&e))?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                files.push(NewImage {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            PRINCIPAL_FIELD => {
                let value = field.text().await.map_err(|e| bad_multipart(&e))?;
                principal = value.parse().ok();
            }
            _ => {
                let value = field.text().await.map_err(|e| bad_multipart(&e))?;
                fields.insert(name, Value::String(value));
            }
        }
    }

    let draft = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::BadRequest(format!("Formulario inválido: {e}")))?;

    Ok(ProductSubmission {
        draft,
        files,
        principal,
    })
}

// =============================================================================
// Routes
// =============================================================================

/// Display the product table with taxonomy panels.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn index(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageProducts>,
    Query(flash): Query<Flash>,
) -> Result<impl IntoResponse> {
    let session = user.auth_session()?;
    let (products, taxonomies) = tokio::try_join!(
        state.api().list_products(&session),
        Taxonomies::load(state.api(), &session),
    )?;

    Ok(ProductsTemplate {
        nav: Nav::for_user(Some(&user)),
        flash,
        products: products.iter().map(ProductRow::from).collect(),
        panels: taxonomies.panels(),
        can_manage_taxonomy: user.can(Permission::ManageTaxonomy),
        can_record_stock: user.can(Permission::RecordStockMovement),
        can_view_forecast: user.can(Permission::ViewForecast),
    })
}

/// Display the new product form.
pub async fn new_form(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageProducts>,
) -> Result<impl IntoResponse> {
    let session = user.auth_session()?;
    let taxonomies = Taxonomies::load(state.api(), &session).await?;
    Ok(ProductFormTemplate::new(
        &user,
        None,
        ProductDraft::default(),
        &taxonomies,
        &Gallery::default(),
    ))
}

/// Display the edit form for an existing product.
#[instrument(skip(state, user, flash), fields(username = %user.username))]
pub async fn edit_form(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageProducts>,
    Path(id): Path<ProductId>,
    Query(flash): Query<Flash>,
) -> Result<impl IntoResponse> {
    let session = user.auth_session()?;
    let (product, images, taxonomies) = tokio::try_join!(
        state.api().get_product(&session, id),
        state.api().list_images(&session, id),
        Taxonomies::load(state.api(), &session),
    )?;

    let mut template = ProductFormTemplate::new(
        &user,
        Some(id),
        ProductDraft::from_product(&product),
        &taxonomies,
        &Gallery::from_existing(images),
    );
    template.flash = flash;
    Ok(template)
}

/// Create a product.
pub async fn create(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageProducts>,
    multipart: Multipart,
) -> Result<Response> {
    let submission = read_submission(multipart).await?;
    save(&state, &user, None, Gallery::default(), submission).await
}

/// Update a product.
pub async fn update(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageProducts>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response> {
    let submission = read_submission(multipart).await?;
    let session = user.auth_session()?;
    let images = state.api().list_images(&session, id).await?;
    save(&state, &user, Some(id), Gallery::from_existing(images), submission).await
}

/// Add the submitted files, then apply the principal choice.
fn fill_gallery(
    gallery: &mut Gallery,
    files: Vec<NewImage>,
    principal: Option<Principal>,
) -> std::result::Result<(), GalleryError> {
    if !files.is_empty() {
        gallery.add_files(files)?;
    }
    if let Some(principal) = principal {
        gallery.set_principal(principal)?;
    }
    Ok(())
}

/// Validate, save, and run the image plan. Validation errors re-render the
/// form with the submitted values.
#[instrument(skip_all, fields(username = %user.username, product_id = ?id))]
async fn save(
    state: &AppState,
    user: &CurrentUser,
    id: Option<ProductId>,
    mut gallery: Gallery,
    submission: ProductSubmission,
) -> Result<Response> {
    let session = user.auth_session()?;
    let ProductSubmission {
        draft,
        files,
        principal,
    } = submission;

    let gallery_result = fill_gallery(&mut gallery, files, principal);
    let checked = match (draft.validate(), gallery_result) {
        (Ok(payload), Ok(())) => Ok(payload),
        (Err(e), _) => Err(e.to_string()),
        (_, Err(e)) => Err(e.to_string()),
    };
    let payload = match checked {
        Ok(payload) => payload,
        Err(message) => {
            tracing::info!(error = %message, "Product form rejected");
            let taxonomies = Taxonomies::load(state.api(), &session).await?;
            let form = ProductFormTemplate::new(user, id, draft, &taxonomies, &gallery)
                .with_error(message);
            return Ok(form.into_response());
        }
    };

    let report = match state
        .api()
        .save_product_with_images(&session, id, &payload, &gallery)
        .await
    {
        Ok(report) => report,
        Err(e) if e.requires_login() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Product save rejected");
            let taxonomies = Taxonomies::load(state.api(), &session).await?;
            let form = ProductFormTemplate::new(user, id, draft, &taxonomies, &gallery)
                .with_error(e.user_message());
            return Ok(form.into_response());
        }
    };

    let message = match report.warning() {
        Some(warning) => Flash::error(&warning),
        None if id.is_some() => Flash::ok("Producto actualizado."),
        None => Flash::ok("Producto creado."),
    };
    Ok(redirect_with("/admin/productos", &message).into_response())
}

/// Delete a product.
#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn delete(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageProducts>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let session = user.auth_session()?;
    match state.api().delete_product(&session, id).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product deleted");
            Ok(redirect_with("/admin/productos", &Flash::ok("Producto eliminado.")).into_response())
        }
        Err(e) if e.requires_login() => Err(e.into()),
        Err(e) => {
            let flash = Flash::error(&e.user_message());
            Ok(redirect_with("/admin/productos", &flash).into_response())
        }
    }
}

/// Which edit form to return to after deleting an image.
#[derive(Debug, Deserialize)]
pub struct ImageDeleteForm {
    pub product: ProductId,
}

/// Delete one product image.
#[instrument(skip(state, user, form), fields(username = %user.username))]
pub async fn delete_image(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ManageProducts>,
    Path(id): Path<ImageId>,
    Form(form): Form<ImageDeleteForm>,
) -> Result<Response> {
    let session = user.auth_session()?;
    let back = format!("/admin/productos/{}/editar", form.product);
    match state.api().delete_image(&session, id).await {
        Ok(()) => Ok(redirect_with(&back, &Flash::ok("Imagen eliminada.")).into_response()),
        Err(e) if e.requires_login() => Err(e.into()),
        Err(e) => Ok(redirect_with(&back, &Flash::error(&e.user_message())).into_response()),
    }
}
