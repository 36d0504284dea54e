//! Session and view models for the web front end.

pub mod nav;
pub mod session;

pub use nav::{Flash, Nav, SelectOption};
pub use session::{CurrentUser, keys};
