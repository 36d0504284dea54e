//! Durable token storage between CLI invocations.
//!
//! The token pair is kept as a small JSON file. Sessions built from it
//! delete the file when the backend rejects the token.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bodega_core::client::{AuthSession, AuthToken};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Serialize, Deserialize)]
struct StoredToken {
    access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh: Option<String>,
}

/// Location of the stored token.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    fn io_error(&self, source: std::io::Error) -> CliError {
        CliError::TokenFile {
            path: self.display(),
            source,
        }
    }

    /// Read the stored token, if any.
    ///
    /// # Errors
    ///
    /// Unreadable file, or contents that are not a decodable token.
    pub fn load(&self) -> Result<Option<AuthToken>, CliError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let corrupt = || CliError::CorruptTokenFile {
            path: self.display(),
        };
        let stored: StoredToken = serde_json::from_str(&raw).map_err(|_| corrupt())?;
        AuthToken::new(stored.access, stored.refresh)
            .map(Some)
            .map_err(|_| corrupt())
    }

    /// Write `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// The file cannot be written.
    pub fn save(&self, token: &AuthToken) -> Result<(), CliError> {
        let stored = StoredToken {
            access: token.access.expose_secret().to_owned(),
            refresh: token.refresh.as_ref().map(|r| r.expose_secret().to_owned()),
        };
        let json = serde_json::to_string(&stored).map_err(|e| self.io_error(e.into()))?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        restrict_permissions(&self.path).map_err(|e| self.io_error(e))
    }

    /// Delete the stored token. Returns whether there was one.
    ///
    /// # Errors
    ///
    /// The file exists but cannot be removed.
    pub fn remove(&self) -> Result<bool, CliError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Session for the stored token; a backend 401 deletes the file.
    ///
    /// # Errors
    ///
    /// No token stored, or the stored one is unreadable or expired.
    pub fn session(&self) -> Result<AuthSession, CliError> {
        let token = self.load()?.ok_or(CliError::NotLoggedIn)?;
        if token.is_expired() {
            tracing::warn!("Stored token has expired");
            self.remove()?;
            return Err(CliError::NotLoggedIn);
        }

        let path = self.path.clone();
        let hook = Arc::new(move || match std::fs::remove_file(&path) {
            Ok(()) => tracing::warn!(path = %path.display(), "Token rejected; token file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::error!(error = %e, "Failed to remove token file"),
        });
        Ok(AuthSession::new(Some(token), Some(hook)))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
