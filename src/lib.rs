//! Catalog of localized strings.
//!
//! - `locale`: lookup and lazy creation of locales
//! - `tag`: lookup and idempotent creation of tags
//! - `translation`: filtered listing, CRUD with tag sync, and export
//! - `http`: axum binding of the operations above

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod locale;
pub mod tag;
pub mod translation;

pub use db::Database;
pub use error::{CatalogError, Result};
