//! Chilean peso amounts.
//!
//! Prices and costs arrive from the backend as decimal strings (`"10000.00"`)
//! and are always displayed without fraction digits, with `.` as the
//! thousands separator and a leading `$`, matching the `es-CL` locale.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount in Chilean pesos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Clp(Decimal);

impl Clp {
    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Decimal> for Clp {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Clp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_clp(self.0))
    }
}

/// Format a decimal amount as CLP currency, e.g. `$12.000`.
///
/// Half-way values round away from zero.
#[must_use]
pub fn format_clp(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Format a raw display value as CLP when it parses as a number.
///
/// Values that are not numeric are returned unchanged.
#[must_use]
pub fn format_clp_str(raw: &str) -> String {
    raw.trim()
        .parse::<Decimal>()
        .map_or_else(|_| raw.trim().to_owned(), format_clp)
}
