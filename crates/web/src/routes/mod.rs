//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Home page
//! GET  /health                            - Health check
//!
//! # Auth
//! GET  /login                             - Login page
//! POST /login                             - Exchange credentials for a token (rate limited)
//! POST /logout                            - End the session
//!
//! # Contact
//! GET  /contacto                          - Contact form
//! POST /contacto                          - Send the contact form
//!
//! # Catalog (ViewCatalog)
//! GET  /catalogo                          - Filterable product grid or table
//! GET  /catalogo/{id}/ficha               - PIM sheet download (DownloadPimSheet)
//!
//! # Products (ManageProducts)
//! GET  /admin/productos                   - Product table and taxonomy panels
//! GET  /admin/productos/nuevo             - New product form
//! POST /admin/productos                   - Create product (multipart)
//! GET  /admin/productos/{id}/editar       - Edit product form
//! POST /admin/productos/{id}              - Update product (multipart)
//! POST /admin/productos/{id}/eliminar     - Delete product
//! POST /admin/imagenes/{id}/eliminar      - Delete one product image
//!
//! # Stock (RecordStockMovement) and forecast (ViewForecast)
//! GET  /admin/productos/{id}/stock        - Movement form and recent movements
//! POST /admin/productos/{id}/stock        - Record a movement
//! GET  /admin/productos/{id}/pronostico   - Restock forecast
//!
//! # Taxonomy (ManageTaxonomy)
//! POST /admin/{kind}                      - Create brand, category or provider
//! POST /admin/{kind}/{id}/eliminar        - Delete brand, category or provider
//!
//! # History (ViewHistory)
//! GET  /admin/historial                   - Audit history with field diffs
//! ```

pub mod auth;
pub mod catalog;
pub mod contact;
pub mod history;
pub mod home;
pub mod products;
pub mod stock;
pub mod taxonomy;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
};
use bodega_core::gallery::{MAX_IMAGE_BYTES, MAX_IMAGES};

use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// Largest product form: every image slot filled, plus the text fields.
pub const PRODUCT_FORM_LIMIT: usize = MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;

/// Redirect carrying a one-shot message, e.g. `redirect_with("/x", &Flash::ok("Listo"))`.
#[must_use]
pub fn redirect_with(path: &str, flash_query: &str) -> Redirect {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{path}{separator}{flash_query}"))
}

/// Create the auth routes router.
pub fn auth_routes(trust_proxy: bool) -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(login_rate_limiter(trust_proxy))),
        )
        .route("/logout", post(auth::logout))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/{id}/ficha", get(catalog::pim_sheet))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/productos",
            get(products::index)
                .post(products::create)
                .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT)),
        )
        .route("/productos/nuevo", get(products::new_form))
        .route(
            "/productos/{id}",
            post(products::update).layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT)),
        )
        .route("/productos/{id}/editar", get(products::edit_form))
        .route("/productos/{id}/eliminar", post(products::delete))
        .route("/productos/{id}/stock", get(stock::page).post(stock::record))
        .route("/productos/{id}/pronostico", get(stock::forecast))
        .route("/imagenes/{id}/eliminar", post(products::delete_image))
        .route("/historial", get(history::index))
        .route("/{kind}", post(taxonomy::create))
        .route("/{kind}/{id}/eliminar", post(taxonomy::delete))
}

/// Create all page routes.
pub fn routes(trust_proxy: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/contacto", get(contact::page).post(contact::submit))
        .merge(auth_routes(trust_proxy))
        .nest("/catalogo", catalog_routes())
        .nest("/admin", admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_with_appends_query() {
        use axum::response::IntoResponse;

        let response = redirect_with("/admin/productos", "ok=Listo").into_response();
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/admin/productos?ok=Listo")
        );

        let response = redirect_with("/catalogo?pagina=2", "error=x").into_response();
        assert_eq!(
            response.headers().get("location").and_then(|v| v.to_str().ok()),
            Some("/catalogo?pagina=2&error=x")
        );
    }
}
