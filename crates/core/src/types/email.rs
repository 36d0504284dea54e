//! Contact email address.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was rejected. Messages are shown on the contact form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("ingrese un correo")]
    Empty,
    #[error("máximo {max} caracteres")]
    TooLong { max: usize },
    #[error("falta la @")]
    MissingAt,
    #[error("el correo no puede contener espacios")]
    Whitespace,
    #[error("formato esperado nombre@dominio.cl")]
    Malformed,
}

/// Address a contact message is answered to.
///
/// Checked the way a browser checks `type="email"` inputs: one `@`, a
/// non-empty local part, and a dotted domain without empty labels.
///
/// ```
/// use bodega_core::Email;
///
/// assert!(Email::parse("ventas@bodegassalas.cl").is_ok());
/// assert!(Email::parse("ventas@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Parse a trimmed address.
    ///
    /// # Errors
    ///
    /// See [`EmailError`].
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAt)?;
        let labels_ok = domain.contains('.') && domain.split('.').all(|label| !label.is_empty());
        if local.is_empty() || domain.contains('@') || !labels_ok {
            return Err(EmailError::Malformed);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
