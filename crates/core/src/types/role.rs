//! Roles and the permission check shared by routing and rendering.

use serde::{Deserialize, Serialize};

/// Who is looking at the application.
///
/// `Admin` and `Seller` come from the `role` claim of the bearer token;
/// `Guest` is anyone without a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access to products, taxonomy, stock movements and history.
    Admin,
    /// Read access to the catalog without costs or providers.
    Seller,
    /// Not logged in.
    #[default]
    Guest,
}

impl Role {
    /// Interpret a `role` claim value.
    ///
    /// An authenticated user with a missing or unrecognized claim is a seller.
    #[must_use]
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim.map(str::trim) {
            Some(c) if c.eq_ignore_ascii_case("admin") => Self::Admin,
            _ => Self::Seller,
        }
    }

    /// Human-readable label for the navigation bar.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Administrador",
            Self::Seller => "Vendedor",
            Self::Guest => "Invitado",
        }
    }

    /// Check a permission for this role. See [`authorize`].
    #[must_use]
    pub const fn can(self, permission: Permission) -> bool {
        authorize(self, permission)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "ADMIN"),
            Self::Seller => write!(f, "SELLER"),
            Self::Guest => write!(f, "GUEST"),
        }
    }
}

/// Actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Browse the product catalog.
    ViewCatalog,
    /// Create, edit and delete products and their images.
    ManageProducts,
    /// Create and delete brands, categories and providers.
    ManageTaxonomy,
    /// Submit IN/OUT/ADJUST stock movements.
    RecordStockMovement,
    /// Read the product audit history.
    ViewHistory,
    /// See cost and provider columns.
    ViewCost,
    /// Download a product's PIM sheet.
    DownloadPimSheet,
    /// See the restock forecast for a product.
    ViewForecast,
}

/// The single authorization check.
#[must_use]
pub const fn authorize(role: Role, permission: Permission) -> bool {
    match role {
        Role::Admin => true,
        Role::Seller => matches!(
            permission,
            Permission::ViewCatalog | Permission::DownloadPimSheet
        ),
        Role::Guest => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: [Permission; 8] = [
        Permission::ViewCatalog,
        Permission::ManageProducts,
        Permission::ManageTaxonomy,
        Permission::RecordStockMovement,
        Permission::ViewHistory,
        Permission::ViewCost,
        Permission::DownloadPimSheet,
        Permission::ViewForecast,
    ];

    #[test]
    fn test_admin_has_everything() {
        assert!(ALL.iter().all(|p| authorize(Role::Admin, *p)));
    }

    #[test]
    fn test_guest_has_nothing() {
        assert!(ALL.iter().all(|p| !authorize(Role::Guest, *p)));
    }

    #[test]
    fn test_seller_is_read_only() {
        assert!(Role::Seller.can(Permission::ViewCatalog));
        assert!(Role::Seller.can(Permission::DownloadPimSheet));
        assert!(!Role::Seller.can(Permission::ManageProducts));
        assert!(!Role::Seller.can(Permission::RecordStockMovement));
        assert!(!Role::Seller.can(Permission::ViewHistory));
        assert!(!Role::Seller.can(Permission::ViewCost));
    }

    #[test]
    fn test_from_claim() {
        assert_eq!(Role::from_claim(Some("ADMIN")), Role::Admin);
        assert_eq!(Role::from_claim(Some("admin")), Role::Admin);
        assert_eq!(Role::from_claim(Some("SELLER")), Role::Seller);
        assert_eq!(Role::from_claim(Some("SUPERVISOR")), Role::Seller);
        assert_eq!(Role::from_claim(None), Role::Seller);
    }
}
