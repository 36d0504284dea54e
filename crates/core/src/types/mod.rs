//! Core types for Bodega.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Clp, format_clp, format_clp_str};
pub use role::{Permission, Role, authorize};
pub use status::*;
