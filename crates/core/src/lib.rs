//! Bodega Core - Shared inventory types and catalog logic.
//!
//! This crate provides the domain layer used by every Bodega front end:
//! - `web` - Server-rendered catalog and administration pages
//! - `cli` - Command-line access to the catalog, history and stock movements
//!
//! # Architecture
//!
//! Everything outside [`client`] is pure: no I/O, no HTTP, no clocks. The
//! backend owns stock arithmetic, auditing and authentication; this crate
//! only decodes what it returns and derives views from it.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, CLP amounts, emails, roles and status enums
//! - [`models`] - Entities as served by the backend REST API
//! - [`audit`] - Field-level diffs between consecutive history snapshots
//! - [`catalog`] - Search, filter, sort and pagination over product lists
//! - [`draft`] - Typed, validated form drafts for writes
//! - [`gallery`] - Product image selection and the post-save upload plan
//! - [`client`] - REST client and bearer-token session (feature `client`)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod audit;
pub mod catalog;
#[cfg(feature = "client")]
pub mod client;
pub mod draft;
pub mod gallery;
pub mod models;
pub mod types;

pub use types::*;
