//! Entities as served by the backend REST API.
//!
//! Field names follow the backend's JSON (`nombre_comercial`, `precio_venta`,
//! ...). Decimal fields accept both the backend's decimal strings and plain
//! JSON numbers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{
    BrandId, CategoryId, Clp, HistoryId, HistoryType, ImageId, MovementId, MovementType,
    ProductId, ProviderId, RatingBand, StockStatus, UserId,
};

/// Shown when a product has no brand.
pub const NO_BRAND: &str = "Sin marca";
/// Shown when a product has no category.
pub const NO_CATEGORY: &str = "Sin categoría";
/// Shown when a product has no provider, or the viewer may not see it.
pub const NO_PROVIDER: &str = "Sin proveedor";

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
}

/// An image attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    /// Absolute URL served by the backend's media storage.
    pub image: String,
    #[serde(default)]
    pub is_principal: bool,
    #[serde(default)]
    pub product: Option<ProductId>,
}

/// A catalog product.
///
/// `costo_cg` and `provider` are absent when the backend serves the seller
/// view of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub nombre_comercial: String,
    #[serde(default)]
    pub ean: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub brand: Option<Brand>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(default)]
    pub peso: Option<Decimal>,
    /// `"alto x largo x ancho"` in centimeters.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dimensiones: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub descripcion: String,
    #[serde(default)]
    pub costo_cg: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lugar_bodega: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub edad_uso: String,
    /// Computed by the backend from stock movements.
    #[serde(default)]
    pub stock: i64,
    pub precio_venta: Decimal,
    #[serde(default)]
    pub rating: Decimal,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    #[must_use]
    pub fn brand_name(&self) -> &str {
        self.brand.as_ref().map_or(NO_BRAND, |b| b.name.as_str())
    }

    #[must_use]
    pub fn category_name(&self) -> &str {
        self.category.as_ref().map_or(NO_CATEGORY, |c| c.name.as_str())
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.as_ref().map_or(NO_PROVIDER, |p| p.name.as_str())
    }

    /// The principal image, falling back to the first one.
    #[must_use]
    pub fn principal_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|img| img.is_principal)
            .or_else(|| self.images.first())
    }

    #[must_use]
    pub const fn price(&self) -> Clp {
        Clp::new(self.precio_venta)
    }

    #[must_use]
    pub fn cost(&self) -> Option<Clp> {
        self.costo_cg.map(Clp::new)
    }

    #[must_use]
    pub const fn stock_status(&self) -> StockStatus {
        StockStatus::from_stock(self.stock)
    }

    #[must_use]
    pub fn rating_band(&self) -> RatingBand {
        RatingBand::from_rating(self.rating)
    }
}

/// A recorded stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product: ProductId,
    pub quantity: i64,
    pub movement_type: MovementType,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A history field value rendered as text.
///
/// History records carry whatever the backend stored: decimal strings,
/// numbers, booleans, foreign-key ids or nested `{id, name}` objects. All of
/// them are reduced to the string the history table shows. `null` and
/// missing values become the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DisplayValue(String);

impl DisplayValue {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::default(),
            Value::String(s) => Self(s.clone()),
            Value::Number(n) => Self(n.to_string()),
            Value::Bool(b) => Self(b.to_string()),
            Value::Object(map) => map
                .get("name")
                .map_or_else(|| Self(value.to_string()), Self::from_json),
            Value::Array(_) => Self(value.to_string()),
        }
    }
}

impl std::fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DisplayValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

/// One snapshot of a product in the audit history.
///
/// The history endpoint returns snapshots for all products, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub history_id: HistoryId,
    pub history_date: DateTime<Utc>,
    pub history_type: HistoryType,
    /// Username of the acting user, when the backend resolves it.
    #[serde(default)]
    pub history_user: Option<String>,
    #[serde(default)]
    pub history_user_id: Option<UserId>,
    /// The product this snapshot belongs to.
    pub id: ProductId,
    #[serde(default)]
    pub nombre_comercial: DisplayValue,
    #[serde(default)]
    pub precio_venta: DisplayValue,
    #[serde(default)]
    pub stock: DisplayValue,
    #[serde(default)]
    pub sku: DisplayValue,
    #[serde(default)]
    pub descripcion: DisplayValue,
    #[serde(default)]
    pub brand_name: DisplayValue,
    #[serde(default)]
    pub category_name: DisplayValue,
    #[serde(default)]
    pub provider_name: DisplayValue,
    /// Raw foreign key or nested object, used when `brand_name` is absent.
    #[serde(default)]
    pub brand: DisplayValue,
    #[serde(default)]
    pub category: DisplayValue,
    #[serde(default)]
    pub provider: DisplayValue,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl HistorySnapshot {
    /// Whether the product was active at this point. Missing means active.
    #[must_use]
    pub fn active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }

    #[must_use]
    pub fn brand_label(&self) -> &DisplayValue {
        prefer_name(&self.brand_name, &self.brand)
    }

    #[must_use]
    pub fn category_label(&self) -> &DisplayValue {
        prefer_name(&self.category_name, &self.category)
    }

    #[must_use]
    pub fn provider_label(&self) -> &DisplayValue {
        prefer_name(&self.provider_name, &self.provider)
    }

    /// `Admin #<id>` for user actions, `Sistema` otherwise.
    #[must_use]
    pub fn actor(&self) -> String {
        self.history_user_id
            .map_or_else(|| "Sistema".to_owned(), |id| format!("Admin #{id}"))
    }
}

fn prefer_name<'a>(name: &'a DisplayValue, fallback: &'a DisplayValue) -> &'a DisplayValue {
    if name.is_empty() { fallback } else { name }
}

/// Restock forecast for a product.
///
/// The backend decides the fields; they are kept in key order for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forecast {
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Forecast {
    /// `(key, value)` pairs rendered as text.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.replace('_', " "), DisplayValue::from_json(v).to_string()))
            .collect()
    }
}

/// A list response: either a bare array or a `{results, next}` page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Page<T> {
    Envelope {
        results: Vec<T>,
        #[serde(default)]
        next: Option<String>,
    },
    Bare(Vec<T>),
}

impl<T> Page<T> {
    /// URL of the following page, if any.
    #[must_use]
    pub fn next(&self) -> Option<&str> {
        match self {
            Self::Envelope { next, .. } => next.as_deref(),
            Self::Bare(_) => None,
        }
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Envelope { results, .. } | Self::Bare(results) => results,
        }
    }
}

const fn default_true() -> bool {
    true
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
