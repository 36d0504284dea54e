//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Format a numeric value as CLP; anything else passes through.
///
/// Usage in templates: `{{ product.precio_venta|clp }}`
#[askama::filter_fn]
pub fn clp(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(bodega_core::format_clp_str(&value.to_string()))
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}
