//! CLI command implementations.
//!
//! Every command writes its result to the given writer; logs go to stderr.

pub mod auth;
pub mod history;
pub mod products;
pub mod stock;

use std::path::PathBuf;

use bodega_core::client::ApiClient;
use chrono::FixedOffset;

use crate::error::CliError;
use crate::token_file::TokenFile;

/// Shared per-invocation state.
pub struct Context {
    pub api: ApiClient,
    pub tokens: TokenFile,
    /// Display timezone for dates.
    pub tz: FixedOffset,
}

impl Context {
    /// # Errors
    ///
    /// Returns `CliError::Api` if the backend URL is invalid, or
    /// `CliError::InvalidTimezone` if the offset is a day or more.
    pub fn new(
        api_url: &str,
        token_file: PathBuf,
        tz_offset_hours: i32,
    ) -> Result<Self, CliError> {
        let tz = tz_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(CliError::InvalidTimezone(tz_offset_hours))?;
        Ok(Self {
            api: ApiClient::new(api_url)?,
            tokens: TokenFile::new(token_file),
            tz,
        })
    }
}
