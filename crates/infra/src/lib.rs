//! Infrastructure layer: the persistence gateway behind the HTTP handlers.

pub mod store;

pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError, StoreResult, UpdateOutcome};
