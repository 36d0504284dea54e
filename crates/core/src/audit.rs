//! Field-level diffs between consecutive product history snapshots.
//!
//! The history list is ordered newest first and mixes every product, so the
//! previous state of a product is the first *later* entry with the same id.
//! Each snapshot is classified as one of:
//!
//! - initial creation, when no earlier snapshot of the product exists;
//! - discontinued or reactivated, when the active flag flipped (the field
//!   diff is not computed in that case);
//! - a list of changed tracked fields, or "no relevant changes".
//!
//! Values are compared after trimming. Price and stock are additionally
//! compared as decimals when both sides parse, so `10000` and `"10000.00"`
//! are the same price.

use rust_decimal::Decimal;

use crate::models::{DisplayValue, HistorySnapshot};
use crate::types::format_clp_str;

/// A product field shown in the history diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    Name,
    Price,
    Stock,
    Sku,
    Brand,
    Category,
    Provider,
    Description,
}

impl TrackedField {
    /// Tracked fields in display order.
    pub const ALL: [Self; 8] = [
        Self::Name,
        Self::Price,
        Self::Stock,
        Self::Sku,
        Self::Brand,
        Self::Category,
        Self::Provider,
        Self::Description,
    ];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Name => "Nombre",
            Self::Price => "Precio",
            Self::Stock => "Stock",
            Self::Sku => "SKU",
            Self::Brand => "Marca",
            Self::Category => "Categoría",
            Self::Provider => "Proveedor",
            Self::Description => "Descripción",
        }
    }

    const fn is_numeric(self) -> bool {
        matches!(self, Self::Price | Self::Stock)
    }

    fn value(self, snapshot: &HistorySnapshot) -> &DisplayValue {
        match self {
            Self::Name => &snapshot.nombre_comercial,
            Self::Price => &snapshot.precio_venta,
            Self::Stock => &snapshot.stock,
            Self::Sku => &snapshot.sku,
            Self::Brand => snapshot.brand_label(),
            Self::Category => snapshot.category_label(),
            Self::Provider => snapshot.provider_label(),
            Self::Description => &snapshot.descripcion,
        }
    }

    fn display(self, value: &DisplayValue) -> String {
        match self {
            Self::Price => format_clp_str(value.as_str()),
            _ => value.trimmed().to_owned(),
        }
    }

    fn unchanged(self, before: &DisplayValue, after: &DisplayValue) -> bool {
        if before.trimmed() == after.trimmed() {
            return true;
        }
        if self.is_numeric() {
            if let (Ok(a), Ok(b)) = (
                before.trimmed().parse::<Decimal>(),
                after.trimmed().parse::<Decimal>(),
            ) {
                return a == b;
            }
        }
        false
    }
}

/// One changed field: label plus before and after display values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: TrackedField,
    pub before: String,
    pub after: String,
}

impl FieldChange {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.field.label()
    }
}

/// How a snapshot differs from the product's previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// First snapshot of the product in the list.
    InitialCreation,
    /// Active flag went from true to false.
    Discontinued,
    /// Active flag went from false to true.
    Reactivated,
    /// At least one tracked field changed.
    Changes(Vec<FieldChange>),
    /// No tracked field changed.
    NoRelevantChanges,
}

impl AuditOutcome {
    /// Summary label; `None` for field changes, which render as a list.
    #[must_use]
    pub const fn label(&self) -> Option<&'static str> {
        match self {
            Self::InitialCreation => Some("Creación inicial"),
            Self::Discontinued => Some("Descontinuado"),
            Self::Reactivated => Some("Reactivado"),
            Self::NoRelevantChanges => Some("Sin cambios relevantes"),
            Self::Changes(_) => None,
        }
    }

    #[must_use]
    pub fn changes(&self) -> &[FieldChange] {
        match self {
            Self::Changes(changes) => changes,
            _ => &[],
        }
    }
}

/// The nearest earlier snapshot of the same product as `history[index]`.
#[must_use]
pub fn find_ancestor(history: &[HistorySnapshot], index: usize) -> Option<&HistorySnapshot> {
    let current = history.get(index)?;
    history
        .iter()
        .skip(index + 1)
        .find(|candidate| candidate.id == current.id)
}

/// Classify `history[index]` against its ancestor.
///
/// Returns `None` when `index` is out of bounds.
#[must_use]
pub fn diff(history: &[HistorySnapshot], index: usize) -> Option<AuditOutcome> {
    let current = history.get(index)?;
    let Some(previous) = find_ancestor(history, index) else {
        return Some(AuditOutcome::InitialCreation);
    };
    Some(compare(previous, current))
}

/// Classify `current` against an explicit `previous` snapshot.
#[must_use]
pub fn compare(previous: &HistorySnapshot, current: &HistorySnapshot) -> AuditOutcome {
    match (previous.active(), current.active()) {
        (true, false) => return AuditOutcome::Discontinued,
        (false, true) => return AuditOutcome::Reactivated,
        _ => {}
    }

    let changes: Vec<FieldChange> = TrackedField::ALL
        .iter()
        .filter_map(|&field| {
            let before = field.value(previous);
            let after = field.value(current);
            (!field.unchanged(before, after)).then(|| FieldChange {
                field,
                before: field.display(before),
                after: field.display(after),
            })
        })
        .collect();

    if changes.is_empty() {
        AuditOutcome::NoRelevantChanges
    } else {
        AuditOutcome::Changes(changes)
    }
}

/// A history row paired with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry<'a> {
    pub snapshot: &'a HistorySnapshot,
    pub outcome: AuditOutcome,
}

/// Classify every snapshot in the list, preserving order.
#[must_use]
pub fn render_all(history: &[HistorySnapshot]) -> Vec<AuditEntry<'_>> {
    history
        .iter()
        .enumerate()
        .map(|(index, snapshot)| AuditEntry {
            snapshot,
            outcome: diff(history, index).unwrap_or(AuditOutcome::InitialCreation),
        })
        .collect()
}
