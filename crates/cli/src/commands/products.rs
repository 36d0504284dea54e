//! `products`: the catalog as a table.

use std::io::Write;

use bodega_core::Permission;
use bodega_core::catalog::{self, CatalogPage, CatalogQuery, PerPage, SortKey, SortOrder};
use clap::Args;
use tracing::instrument;

use super::Context;
use crate::error::CliError;

/// Filter, sort and page flags.
#[derive(Debug, Args)]
pub struct ProductsArgs {
    /// Substring of name, SKU, EAN or brand
    #[arg(short, long, default_value = "")]
    pub search: String,

    /// Exact category name
    #[arg(long)]
    pub category: Option<String>,

    /// Exact brand name
    #[arg(long)]
    pub brand: Option<String>,

    /// Sort key (`nombre_comercial`, `marca`, `categoria`, `precio_venta`, `stock`, `rating`)
    #[arg(long, default_value = "nombre_comercial")]
    pub sort: SortKey,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Items per page, or `all`
    #[arg(long, default_value = "20")]
    pub per_page: PerPage,
}

impl ProductsArgs {
    #[must_use]
    pub fn to_query(&self) -> CatalogQuery {
        CatalogQuery {
            search: self.search.trim().to_owned(),
            category: self.category.clone(),
            brand: self.brand.clone(),
            sort: self.sort,
            order: if self.desc { SortOrder::Desc } else { SortOrder::Asc },
            per_page: self.per_page,
            page: self.page,
        }
    }
}

/// Fetch, filter and print one page of the catalog.
///
/// # Errors
///
/// Not logged in, or the backend call failed.
#[instrument(skip(ctx, out))]
pub async fn list(
    ctx: &Context,
    query: &CatalogQuery,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let session = ctx.tokens.session()?;
    let products = ctx.api.list_products(&session).await?;
    let show_cost = session.role().await.can(Permission::ViewCost);

    let page = catalog::apply(&products, query);
    write_page(&page, show_cost, out)?;
    Ok(())
}

fn write_page(
    page: &CatalogPage<'_>,
    show_cost: bool,
    out: &mut impl Write,
) -> std::io::Result<()> {
    if page.items.is_empty() {
        return writeln!(out, "No hay productos que coincidan con la búsqueda.");
    }

    write!(
        out,
        "{:>5}  {:<12} {:<30} {:<16} {:<16} {:>12}",
        "ID", "SKU", "Nombre", "Marca", "Categoría", "Precio"
    )?;
    if show_cost {
        write!(out, " {:>12}", "Costo")?;
    }
    writeln!(out, " {:>6}  Estado", "Stock")?;

    for product in &page.items {
        write!(
            out,
            "{:>5}  {:<12} {:<30} {:<16} {:<16} {:>12}",
            product.id,
            product.sku,
            product.nombre_comercial,
            product.brand_name(),
            product.category_name(),
            product.price().to_string(),
        )?;
        if show_cost {
            let cost = product.cost().map_or_else(|| "-".to_owned(), |c| c.to_string());
            write!(out, " {cost:>12}")?;
        }
        writeln!(out, " {:>6}  {}", product.stock, product.stock_status().label())?;
    }

    writeln!(
        out,
        "Página {} de {} · {} producto(s)",
        page.page, page.total_pages, page.total
    )
}
