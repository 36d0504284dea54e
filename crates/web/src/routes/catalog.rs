//! Catalog route handlers.
//!
//! The whole product list is fetched once per request and filtered, sorted
//! and paginated in memory by [`bodega_core::catalog`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use bodega_core::catalog::{self, CatalogQuery, PerPage, SortKey, SortOrder};
use bodega_core::models::Product;
use bodega_core::{Permission, ProductId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Authorized, gates};
use crate::models::{CurrentUser, Flash, Nav, SelectOption};
use crate::state::AppState;

// =============================================================================
// Query Types
// =============================================================================

/// Catalog query string. Unknown or malformed values fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub categoria: String,
    #[serde(default)]
    pub marca: String,
    #[serde(default)]
    pub orden: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub por_pagina: String,
    #[serde(default)]
    pub pagina: String,
    /// `lista` for the table view, anything else for the grid.
    #[serde(default)]
    pub vista: String,
}

impl CatalogParams {
    #[must_use]
    pub fn to_query(&self) -> CatalogQuery {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_owned())
        };
        CatalogQuery {
            search: self.q.trim().to_owned(),
            category: non_empty(&self.categoria),
            brand: non_empty(&self.marca),
            sort: self.orden.parse().unwrap_or_default(),
            order: self.dir.parse().unwrap_or_default(),
            per_page: self.por_pagina.parse().unwrap_or_default(),
            page: self.pagina.trim().parse().unwrap_or(1),
        }
    }

    #[must_use]
    pub fn is_list_view(&self) -> bool {
        self.vista == "lista"
    }

    /// Link to another page of the same query.
    #[must_use]
    pub fn page_href(&self, query: &CatalogQuery, page: usize) -> String {
        let mut pairs = vec![
            ("q", query.search.clone()),
            ("categoria", query.category.clone().unwrap_or_default()),
            ("marca", query.brand.clone().unwrap_or_default()),
            ("orden", query.sort.code().to_owned()),
            ("dir", query.order.code().to_owned()),
            ("por_pagina", query.per_page.code()),
            ("pagina", page.to_string()),
        ];
        if self.is_list_view() {
            pairs.push(("vista", "lista".to_owned()));
        }
        let encoded: Vec<String> = pairs
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(&v)))
            .collect();
        format!("/catalogo?{}", encoded.join("&"))
    }
}

// =============================================================================
// View Types
// =============================================================================

/// One product as shown in the grid or table.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub ean: String,
    pub brand: String,
    pub category: String,
    pub price: String,
    /// Only filled for roles allowed to see costs.
    pub cost: Option<String>,
    pub stock: i64,
    pub stock_label: &'static str,
    pub stock_variant: &'static str,
    pub rating: String,
    pub rating_variant: &'static str,
    pub image_url: Option<String>,
    pub description: String,
    pub dimensions: String,
    pub location: String,
}

impl CatalogItem {
    fn new(product: &Product, user: &CurrentUser) -> Self {
        let status = product.stock_status();
        Self {
            id: product.id,
            name: product.nombre_comercial.clone(),
            sku: product.sku.clone(),
            ean: product.ean.clone(),
            brand: product.brand_name().to_owned(),
            category: product.category_name().to_owned(),
            price: product.price().to_string(),
            cost: user
                .can(Permission::ViewCost)
                .then(|| product.cost().map(|c| c.to_string()))
                .flatten(),
            stock: product.stock,
            stock_label: status.label(),
            stock_variant: status.variant(),
            rating: product.rating.normalize().to_string(),
            rating_variant: product.rating_band().variant(),
            image_url: product.principal_image().map(|img| img.image.clone()),
            description: product.descripcion.clone(),
            dimensions: product.dimensiones.clone(),
            location: product.lugar_bodega.clone(),
        }
    }
}

/// A page link in the pagination control.
#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub nav: Nav,
    pub flash: Flash,
    pub items: Vec<CatalogItem>,
    pub total: usize,
    pub search: String,
    pub list_view: bool,
    pub categories: Vec<SelectOption>,
    pub brands: Vec<SelectOption>,
    pub sort_keys: Vec<SelectOption>,
    pub orders: Vec<SelectOption>,
    pub page_sizes: Vec<SelectOption>,
    pub pages: Vec<PageLink>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub show_cost: bool,
    pub can_download_sheet: bool,
}

// =============================================================================
// Routes
// =============================================================================

/// Display the catalog.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn index(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::ViewCatalog>,
    Query(params): Query<CatalogParams>,
    Query(flash): Query<Flash>,
) -> Result<impl IntoResponse> {
    let session = user.auth_session()?;
    let products = state.api().list_products(&session).await?;

    let query = params.to_query();
    let page = catalog::apply(&products, &query);

    let category = query.category.clone().unwrap_or_default();
    let brand = query.brand.clone().unwrap_or_default();
    let per_page = query.per_page.code();

    Ok(CatalogTemplate {
        nav: Nav::for_user(Some(&user)),
        flash,
        items: page.items.iter().map(|p| CatalogItem::new(p, &user)).collect(),
        total: page.total,
        search: query.search.clone(),
        list_view: params.is_list_view(),
        categories: catalog::distinct_categories(&products)
            .into_iter()
            .map(|c| SelectOption::new(c.clone(), c, &category))
            .collect(),
        brands: catalog::distinct_brands(&products)
            .into_iter()
            .map(|b| SelectOption::new(b.clone(), b, &brand))
            .collect(),
        sort_keys: SortKey::ALL
            .iter()
            .map(|k| SelectOption::new(k.code(), k.label(), query.sort.code()))
            .collect(),
        orders: [(SortOrder::Asc, "Ascendente"), (SortOrder::Desc, "Descendente")]
            .iter()
            .map(|(o, label)| SelectOption::new(o.code(), *label, query.order.code()))
            .collect(),
        page_sizes: PerPage::CHOICES
            .iter()
            .map(|p| SelectOption::new(p.code(), p.label(), &per_page))
            .collect(),
        pages: page
            .window
            .iter()
            .map(|&n| PageLink {
                number: n,
                href: params.page_href(&query, n),
                current: n == page.page,
            })
            .collect(),
        previous_href: page
            .has_previous()
            .then(|| params.page_href(&query, page.page - 1)),
        next_href: page
            .has_next()
            .then(|| params.page_href(&query, page.page + 1)),
        show_cost: user.can(Permission::ViewCost),
        can_download_sheet: user.can(Permission::DownloadPimSheet),
    })
}

/// Download a product's PIM sheet.
#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn pim_sheet(
    State(state): State<AppState>,
    Authorized(user, ..): Authorized<gates::DownloadPimSheet>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let session = user.auth_session()?;
    let document = state.api().pim_sheet(&session, id).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, document.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name.replace('"', "")),
        )
        .body(Body::from(document.bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}
