//! Typed form drafts and the write payloads they validate into.
//!
//! A draft holds what the user typed, with named optional fields. Calling
//! `validate()` either fails with the first [`DraftError`] or yields the
//! exact JSON payload sent to the backend. Validation is limited to presence
//! and range checks; the backend remains the authority.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::Product;
use crate::types::{BrandId, CategoryId, Email, EmailError, MovementType, ProductId, ProviderId};

/// Reason suggested for manual stock movements.
pub const DEFAULT_MOVEMENT_REASON: &str = "Movimiento Manual Admin";

/// Why a draft cannot be submitted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Los valores numéricos no pueden ser negativos.")]
    Negative(&'static str),

    #[error("El rating no puede exceder 5.")]
    RatingTooHigh,

    #[error("Campos requeridos faltantes: {}.", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("La cantidad debe ser al menos 1.")]
    QuantityTooSmall,

    #[error("El motivo del movimiento es obligatorio.")]
    MissingReason,

    #[error("El nombre es requerido.")]
    MissingName,

    #[error("Correo inválido: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Asunto no válido.")]
    InvalidSubject,

    #[error("El mensaje es requerido.")]
    MissingMessage,
}

// =============================================================================
// Product
// =============================================================================

/// Product create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductDraft {
    #[serde(default)]
    pub nombre_comercial: String,
    #[serde(default)]
    pub ean: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub brand_id: Option<BrandId>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub provider_id: Option<ProviderId>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub precio_venta: Option<Decimal>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub costo_cg: Option<Decimal>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub peso: Option<Decimal>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub rating: Option<Decimal>,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub lugar_bodega: String,
    #[serde(default)]
    pub edad_uso: String,
    /// Height input, cm.
    #[serde(default)]
    pub alto: String,
    /// Length input, cm.
    #[serde(default)]
    pub largo: String,
    /// Width input, cm.
    #[serde(default)]
    pub ancho: String,
}

/// JSON body for `POST /api/products/` and `PATCH /api/products/{id}/`.
///
/// Stock is never written; it only changes through stock movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPayload {
    pub nombre_comercial: String,
    pub ean: String,
    pub sku: String,
    pub brand_id: BrandId,
    pub category_id: CategoryId,
    pub provider_id: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio_venta: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub costo_cg: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peso: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Decimal>,
    pub dimensiones: String,
    pub descripcion: String,
    pub lugar_bodega: String,
    pub edad_uso: String,
}

impl ProductDraft {
    /// Pre-fill the edit form from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        let (alto, largo, ancho) = split_dimensions(&product.dimensiones);
        Self {
            nombre_comercial: product.nombre_comercial.clone(),
            ean: product.ean.clone(),
            sku: product.sku.clone(),
            brand_id: product.brand.as_ref().map(|b| b.id),
            category_id: product.category.as_ref().map(|c| c.id),
            provider_id: product.provider.as_ref().map(|p| p.id),
            precio_venta: Some(product.precio_venta),
            costo_cg: product.costo_cg,
            peso: product.peso,
            rating: Some(product.rating),
            descripcion: product.descripcion.clone(),
            lugar_bodega: product.lugar_bodega.clone(),
            edad_uso: product.edad_uso.clone(),
            alto,
            largo,
            ancho,
        }
    }

    /// `"alto x largo x ancho"` when all three inputs are numbers, else empty.
    #[must_use]
    pub fn dimensiones(&self) -> String {
        let parse = |s: &str| s.trim().parse::<Decimal>().ok().map(|d| d.normalize());
        match (parse(&self.alto), parse(&self.largo), parse(&self.ancho)) {
            (Some(a), Some(l), Some(w)) => format!("{a} x {l} x {w}"),
            _ => String::new(),
        }
    }

    /// Check ranges, then required fields.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<ProductPayload, DraftError> {
        for (label, value) in [
            ("precio_venta", self.precio_venta),
            ("costo_cg", self.costo_cg),
            ("peso", self.peso),
            ("rating", self.rating),
        ] {
            if value.is_some_and(|v| v.is_sign_negative() && !v.is_zero()) {
                return Err(DraftError::Negative(label));
            }
        }
        if self.rating.is_some_and(|r| r > Decimal::from(5)) {
            return Err(DraftError::RatingTooHigh);
        }

        let mut missing = Vec::new();
        for (label, value) in [
            ("nombre_comercial", &self.nombre_comercial),
            ("ean", &self.ean),
            ("sku", &self.sku),
        ] {
            if value.trim().is_empty() {
                missing.push(label);
            }
        }
        if self.brand_id.is_none() {
            missing.push("brand_id");
        }
        if self.category_id.is_none() {
            missing.push("category_id");
        }
        if self.provider_id.is_none() {
            missing.push("provider_id");
        }

        let (Some(brand_id), Some(category_id), Some(provider_id), true) = (
            self.brand_id,
            self.category_id,
            self.provider_id,
            missing.is_empty(),
        ) else {
            return Err(DraftError::MissingFields(missing));
        };

        Ok(ProductPayload {
            nombre_comercial: self.nombre_comercial.trim().to_owned(),
            ean: self.ean.trim().to_owned(),
            sku: self.sku.trim().to_owned(),
            brand_id,
            category_id,
            provider_id,
            precio_venta: self.precio_venta,
            costo_cg: self.costo_cg,
            peso: self.peso,
            rating: self.rating,
            dimensiones: self.dimensiones(),
            descripcion: self.descripcion.clone(),
            lugar_bodega: self.lugar_bodega.clone(),
            edad_uso: self.edad_uso.clone(),
        })
    }
}

/// Split a stored `"a x l x w"` string into its three trimmed parts.
///
/// Missing parts are empty strings.
#[must_use]
pub fn split_dimensions(raw: &str) -> (String, String, String) {
    let mut parts = raw.split(['x', 'X']).map(|s| s.trim().to_owned());
    (
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
    )
}

// =============================================================================
// Stock movement
// =============================================================================

/// Stock movement form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockMovementDraft {
    pub product: ProductId,
    pub quantity: i64,
    pub movement_type: MovementType,
    #[serde(default)]
    pub reason: String,
}

impl StockMovementDraft {
    /// Empty form for a product: one unit in, default reason.
    #[must_use]
    pub fn for_product(product: ProductId) -> Self {
        Self {
            product,
            quantity: 1,
            movement_type: MovementType::In,
            reason: DEFAULT_MOVEMENT_REASON.to_owned(),
        }
    }

    /// # Errors
    ///
    /// Quantity below 1 or a blank reason.
    pub fn validate(&self) -> Result<NewStockMovement, DraftError> {
        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(DraftError::QuantityTooSmall)?;
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(DraftError::MissingReason);
        }
        Ok(NewStockMovement {
            product: self.product,
            quantity,
            movement_type: self.movement_type,
            reason: reason.to_owned(),
        })
    }
}

/// JSON body for `POST /api/stock-movements/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewStockMovement {
    pub product: ProductId,
    pub quantity: u32,
    pub movement_type: MovementType,
    pub reason: String,
}

// =============================================================================
// Taxonomy
// =============================================================================

/// Brand, category or provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxonomyKind {
    Brand,
    Category,
    Provider,
}

impl TaxonomyKind {
    pub const ALL: [Self; 3] = [Self::Brand, Self::Category, Self::Provider];

    /// REST collection path segment.
    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        match self {
            Self::Brand => "brands",
            Self::Category => "categories",
            Self::Provider => "providers",
        }
    }

    /// URL segment used by the web pages.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Brand => "marcas",
            Self::Category => "categorias",
            Self::Provider => "proveedores",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Brand => "Marca",
            Self::Category => "Categoría",
            Self::Provider => "Proveedor",
        }
    }
}

impl FromStr for TaxonomyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.slug() == s || k.endpoint() == s)
            .ok_or_else(|| format!("invalid taxonomy kind: {s}"))
    }
}

/// New brand, category or provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaxonomyDraft {
    #[serde(default)]
    pub name: String,
}

/// JSON body for `POST /api/{brands,categories,providers}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTaxonomyEntry {
    pub name: String,
}

impl TaxonomyDraft {
    /// # Errors
    ///
    /// Blank name.
    pub fn validate(&self) -> Result<NewTaxonomyEntry, DraftError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        Ok(NewTaxonomyEntry {
            name: name.to_owned(),
        })
    }
}

// =============================================================================
// Contact
// =============================================================================

/// Subjects offered by the contact form.
pub const CONTACT_SUBJECTS: [&str; 3] = ["Cotización PYME", "Soporte Técnico", "Agendar Visita"];

/// Contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// JSON body for `POST /api/contact-form/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    pub subject: String,
    pub message: String,
}

impl ContactDraft {
    /// # Errors
    ///
    /// Blank name or message, malformed email, or an unknown subject.
    pub fn validate(&self) -> Result<ContactMessage, DraftError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        let email = Email::parse(&self.email)?;
        let subject = self.subject.trim();
        if !CONTACT_SUBJECTS.contains(&subject) {
            return Err(DraftError::InvalidSubject);
        }
        let message = self.message.trim();
        if message.is_empty() {
            return Err(DraftError::MissingMessage);
        }
        Ok(ContactMessage {
            name: name.to_owned(),
            email,
            subject: subject.to_owned(),
            message: message.to_owned(),
        })
    }
}

/// Empty or whitespace-only form values deserialize as `None`.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
