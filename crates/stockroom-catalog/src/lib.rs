//! Item catalog model and read access for index builds.
//!
//! The catalog is owned by the storage subsystem (shelf → container →
//! compartment → item). This crate only reads full snapshots of it.

pub mod error;
pub mod source;
pub mod sqlite;
pub mod types;

pub use error::CatalogError;
pub use source::{CatalogSource, InMemoryCatalog};
pub use sqlite::SqliteCatalog;
pub use types::{CatalogRecord, RecordId, ResolvedLocation, TechnicalDetails};
