//! Per-page view data shared by every template.

use bodega_core::Permission;
use serde::Deserialize;

use super::CurrentUser;

/// Navigation bar state, decided by the same permission check as routing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nav {
    pub username: Option<String>,
    pub role_label: &'static str,
    pub catalog: bool,
    pub products: bool,
    pub history: bool,
}

impl Nav {
    #[must_use]
    pub fn for_user(user: Option<&CurrentUser>) -> Self {
        let role = user.map(|u| u.role).unwrap_or_default();
        Self {
            username: user.map(|u| u.username.clone()),
            role_label: role.label(),
            catalog: role.can(Permission::ViewCatalog),
            products: role.can(Permission::ManageProducts),
            history: role.can(Permission::ViewHistory),
        }
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }
}

/// One `<option>` of a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        Self {
            selected: value == current,
            label: label.into(),
            value,
        }
    }
}

/// One-shot message carried in the query string after a redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Flash {
    #[serde(default)]
    pub ok: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Flash {
    /// Query string suffix for a success message.
    #[must_use]
    pub fn ok(message: &str) -> String {
        format!("ok={}", urlencoding::encode(message))
    }

    /// Query string suffix for an error message.
    #[must_use]
    pub fn error(message: &str) -> String {
        format!("error={}", urlencoding::encode(message))
    }
}
