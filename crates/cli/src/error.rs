//! CLI error type.

use bodega_core::client::ApiError;
use bodega_core::draft::DraftError;
use thiserror::Error;

/// Errors that end a CLI invocation with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// Backend call failed.
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),

    /// Input rejected before reaching the backend.
    #[error("{0}")]
    Draft(#[from] DraftError),

    /// No usable token on disk.
    #[error("Not logged in. Run `bodega login -u USER` first.")]
    NotLoggedIn,

    /// Token file could not be read or written.
    #[error("Token file {path}: {source}")]
    TokenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Token file holds something other than a token pair.
    #[error("Token file {path} is corrupt; run `bodega logout` and log in again")]
    CorruptTokenFile { path: String },

    /// `--tz-offset` is not a valid UTC offset.
    #[error("Invalid timezone offset: {0} hours")]
    InvalidTimezone(i32),

    /// Writing to the terminal failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}
