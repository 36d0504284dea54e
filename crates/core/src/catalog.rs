//! Search, filter, sort and pagination over an in-memory product list.
//!
//! Everything here is pure and deterministic: the same products and query
//! always produce the same page.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::Product;

/// Column a catalog can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    #[default]
    Name,
    Brand,
    Category,
    Price,
    Stock,
    Rating,
}

impl SortKey {
    pub const ALL: [Self; 6] = [
        Self::Name,
        Self::Brand,
        Self::Category,
        Self::Price,
        Self::Stock,
        Self::Rating,
    ];

    /// Query-string code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Name => "nombre_comercial",
            Self::Brand => "marca",
            Self::Category => "categoria",
            Self::Price => "precio_venta",
            Self::Stock => "stock",
            Self::Rating => "rating",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Name => "Nombre",
            Self::Brand => "Marca",
            Self::Category => "Categoría",
            Self::Price => "Precio",
            Self::Stock => "Stock",
            Self::Rating => "Rating",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Name => cmp_text(&a.nombre_comercial, &b.nombre_comercial),
            Self::Brand => cmp_text(a.brand_name(), b.brand_name()),
            Self::Category => cmp_text(a.category_name(), b.category_name()),
            Self::Price => a.precio_venta.cmp(&b.precio_venta),
            Self::Stock => a.stock.cmp(&b.stock),
            Self::Rating => a.rating.cmp(&b.rating),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.code() == s)
            .ok_or_else(|| format!("invalid sort key: {s}"))
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(format!("invalid sort order: {s}")),
        }
    }
}

/// Page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerPage {
    Fixed(usize),
    All,
}

impl PerPage {
    /// Sizes offered in the page-size selector.
    pub const CHOICES: [Self; 4] = [Self::Fixed(20), Self::Fixed(50), Self::Fixed(100), Self::All];

    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Fixed(n) => n.to_string(),
            Self::All => "all".to_owned(),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Fixed(n) => n.to_string(),
            Self::All => "Todos".to_owned(),
        }
    }
}

impl Default for PerPage {
    fn default() -> Self {
        Self::Fixed(20)
    }
}

impl std::str::FromStr for PerPage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "todos" => Ok(Self::All),
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Self::Fixed(n)),
                _ => Err(format!("invalid page size: {s}")),
            },
        }
    }
}

/// Filter, sort and page parameters for one catalog view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogQuery {
    /// Case-insensitive substring matched against name, SKU, EAN and brand.
    pub search: String,
    /// Exact category name.
    pub category: Option<String>,
    /// Exact brand name.
    pub brand: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub per_page: PerPage,
    /// 1-based page number; clamped to the available pages.
    pub page: usize,
}

impl CatalogQuery {
    /// Whether `product` passes the search and equality filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let needle = self.search.trim().to_lowercase();
        let search_ok = needle.is_empty()
            || [
                product.nombre_comercial.as_str(),
                product.sku.as_str(),
                product.ean.as_str(),
                product.brand.as_ref().map_or("", |b| b.name.as_str()),
            ]
            .iter()
            .any(|haystack| haystack.to_lowercase().contains(&needle));

        let category_ok = self.category.as_deref().is_none_or(|wanted| {
            product.category.as_ref().is_some_and(|c| c.name == wanted)
        });
        let brand_ok = self
            .brand
            .as_deref()
            .is_none_or(|wanted| product.brand.as_ref().is_some_and(|b| b.name == wanted));

        search_ok && category_ok && brand_ok
    }
}

/// The products that pass the query's filters, in input order.
#[must_use]
pub fn filter<'a>(products: &'a [Product], query: &CatalogQuery) -> Vec<&'a Product> {
    products.iter().filter(|p| query.matches(p)).collect()
}

/// Stable sort by a single key.
pub fn sort(products: &mut [&Product], key: SortKey, order: SortOrder) {
    products.sort_by(|a, b| {
        let ord = key.compare(a, b);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// One rendered page of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage<'a> {
    pub items: Vec<&'a Product>,
    /// Products matching the filters, across all pages.
    pub total: usize,
    /// Current page after clamping, 1-based.
    pub page: usize,
    pub total_pages: usize,
    /// Page numbers for the pagination control.
    pub window: Vec<usize>,
}

impl CatalogPage<'_> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Filter, sort and paginate.
#[must_use]
pub fn apply<'a>(products: &'a [Product], query: &CatalogQuery) -> CatalogPage<'a> {
    let mut matched = filter(products, query);
    sort(&mut matched, query.sort, query.order);

    let total = matched.len();
    let (page, total_pages, items) = match query.per_page {
        PerPage::All => (1, 1, matched),
        PerPage::Fixed(size) => {
            let size = size.max(1);
            let total_pages = total.div_ceil(size).max(1);
            let page = query.page.clamp(1, total_pages);
            let items = matched
                .into_iter()
                .skip((page - 1) * size)
                .take(size)
                .collect();
            (page, total_pages, items)
        }
    };

    CatalogPage {
        items,
        total,
        page,
        total_pages,
        window: page_window(page, total_pages),
    }
}

/// Up to five page numbers centred on `current` where possible.
#[must_use]
pub fn page_window(current: usize, total_pages: usize) -> Vec<usize> {
    if total_pages <= 1 {
        return vec![1];
    }
    let start = total_pages
        .saturating_sub(4)
        .min(current.saturating_sub(2))
        .max(1);
    let end = (start + 4).min(total_pages);
    (start..=end).collect()
}

/// Sorted distinct brand names, for the brand filter.
#[must_use]
pub fn distinct_brands(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter_map(|p| p.brand.as_ref().map(|b| b.name.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct category names, for the category filter.
#[must_use]
pub fn distinct_categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter_map(|p| p.category.as_ref().map(|c| c.name.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
