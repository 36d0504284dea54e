//! Status enums for stock movements, history records and catalog badges.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of manual stock movement.
///
/// The backend applies the movement to the stock count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Goods received.
    #[default]
    In,
    /// Goods dispatched.
    Out,
    /// Loss or shrinkage correction.
    Adjust,
}

impl MovementType {
    /// All movement types, in form order.
    pub const ALL: [Self; 3] = [Self::In, Self::Out, Self::Adjust];

    /// Wire code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Adjust => "ADJUST",
        }
    }

    /// Form label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::In => "Entrada (+)",
            Self::Out => "Salida (-)",
            Self::Adjust => "Ajuste de Pérdida (-)",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "ADJUST" => Ok(Self::Adjust),
            _ => Err(format!("invalid movement type: {s}")),
        }
    }
}

/// Change type of a history record (`+`, `~`, `-`).
///
/// Any other code is kept as is and shown as a neutral badge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HistoryType {
    Created,
    Updated,
    Deleted,
    Other(String),
}

impl HistoryType {
    /// Badge label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Created => "Creación",
            Self::Updated => "Modificación",
            Self::Deleted => "Eliminación",
            Self::Other(code) => code,
        }
    }

    /// Badge color class.
    #[must_use]
    pub const fn variant(&self) -> &'static str {
        match self {
            Self::Created => "success",
            Self::Updated => "warning",
            Self::Deleted => "danger",
            Self::Other(_) => "secondary",
        }
    }
}

impl From<String> for HistoryType {
    fn from(code: String) -> Self {
        match code.as_str() {
            "+" => Self::Created,
            "~" => Self::Updated,
            "-" => Self::Deleted,
            _ => Self::Other(code),
        }
    }
}

impl From<HistoryType> for String {
    fn from(kind: HistoryType) -> Self {
        match kind {
            HistoryType::Created => "+".to_owned(),
            HistoryType::Updated => "~".to_owned(),
            HistoryType::Deleted => "-".to_owned(),
            HistoryType::Other(code) => code,
        }
    }
}

/// Availability badge derived from a stock count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockStatus {
    OutOfStock,
    Low,
    Available,
}

impl StockStatus {
    /// Counts below this are flagged as low stock.
    pub const LOW_THRESHOLD: i64 = 10;

    #[must_use]
    pub const fn from_stock(stock: i64) -> Self {
        if stock <= 0 {
            Self::OutOfStock
        } else if stock < Self::LOW_THRESHOLD {
            Self::Low
        } else {
            Self::Available
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OutOfStock => "Agotado",
            Self::Low => "Pocas unidades",
            Self::Available => "Disponible",
        }
    }

    #[must_use]
    pub const fn variant(&self) -> &'static str {
        match self {
            Self::OutOfStock => "danger",
            Self::Low => "warning",
            Self::Available => "success",
        }
    }
}

/// Color band for a 0-5 rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingBand {
    Perfect,
    Good,
    Fair,
    Poor,
}

impl RatingBand {
    #[must_use]
    pub fn from_rating(rating: Decimal) -> Self {
        if rating >= Decimal::from(5) {
            Self::Perfect
        } else if rating >= Decimal::from(4) {
            Self::Good
        } else if rating >= Decimal::new(31, 1) {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    #[must_use]
    pub const fn variant(&self) -> &'static str {
        match self {
            Self::Perfect => "primary",
            Self::Good => "success",
            Self::Fair => "warning",
            Self::Poor => "danger",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_wire_format() {
        assert_eq!(serde_json::to_string(&MovementType::Adjust).unwrap(), "\"ADJUST\"");
        let parsed: MovementType = serde_json::from_str("\"OUT\"").unwrap();
        assert_eq!(parsed, MovementType::Out);
        assert_eq!("in".parse::<MovementType>().unwrap(), MovementType::In);
        assert!("MOVE".parse::<MovementType>().is_err());
    }

    #[test]
    fn test_history_type_symbols() {
        let parsed: Vec<HistoryType> = serde_json::from_str(r#"["+", "~", "-"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![HistoryType::Created, HistoryType::Updated, HistoryType::Deleted]
        );
        assert_eq!(HistoryType::Updated.label(), "Modificación");
        assert_eq!(serde_json::to_string(&HistoryType::Deleted).unwrap(), "\"-\"");
    }

    #[test]
    fn test_unknown_history_type_is_kept() {
        let parsed: HistoryType = serde_json::from_str("\"?\"").unwrap();
        assert_eq!(parsed, HistoryType::Other("?".to_owned()));
        assert_eq!(parsed.label(), "?");
        assert_eq!(parsed.variant(), "secondary");
    }

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::from_stock(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_stock(-3), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_stock(9), StockStatus::Low);
        assert_eq!(StockStatus::from_stock(10), StockStatus::Available);
        assert_eq!(StockStatus::from_stock(1).label(), "Pocas unidades");
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(RatingBand::from_rating(Decimal::from(5)), RatingBand::Perfect);
        assert_eq!(RatingBand::from_rating(Decimal::new(45, 1)), RatingBand::Good);
        assert_eq!(RatingBand::from_rating(Decimal::new(31, 1)), RatingBand::Fair);
        assert_eq!(RatingBand::from_rating(Decimal::new(30, 1)), RatingBand::Poor);
    }
}
