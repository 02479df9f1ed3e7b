//! Persistence gateway for events and registrations.
//!
//! ## Counter maintenance
//!
//! `insert_registration` and `delete_registration` change the parent event's
//! `total_registration_count` in the same atomic step as the registration
//! write (one lock in memory, one transaction in Postgres). Concurrent
//! creates/deletes against the same event therefore never lose updates, and
//! the counter is floored at zero.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use sprintspace_core::{
    DocumentId, Event, EventFilter, EventPatch, PageRequest, Registration, RegistrationFilter, RegistrationPatch,
};

pub mod in_memory;
pub mod postgres;
pub mod schema;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("event not found: {0}")]
    EventNotFound(DocumentId),

    #[error("registration not found: {0}")]
    RegistrationNotFound(DocumentId),

    #[error("duplicate identifier: {0}")]
    Duplicate(DocumentId),

    /// A stored row could not be mapped back to a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Result of a partial update (mirrors matched/modified acknowledgements).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: bool,
    pub modified: bool,
}

impl UpdateOutcome {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Storage operations used by the HTTP handlers.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_event(&self, event: Event) -> StoreResult<()>;

    async fn find_event(&self, id: DocumentId) -> StoreResult<Option<Event>>;

    /// Events matching `filter`, ordered by creation time. `window` selects a
    /// page; `None` returns every match.
    async fn list_events(&self, filter: &EventFilter, window: Option<PageRequest>) -> StoreResult<Vec<Event>>;

    async fn count_events(&self, filter: &EventFilter) -> StoreResult<u64>;

    /// Events starting strictly after `after`, soonest first.
    async fn upcoming_events(&self, after: NaiveDate, limit: u32) -> StoreResult<Vec<Event>>;

    async fn update_event(&self, id: DocumentId, patch: &EventPatch) -> StoreResult<UpdateOutcome>;

    /// Returns whether a record was deleted. Registrations are left in place.
    async fn delete_event(&self, id: DocumentId) -> StoreResult<bool>;

    /// Insert and increment the parent counter atomically.
    ///
    /// Fails with [`StoreError::EventNotFound`] (and writes nothing) when the
    /// parent does not exist.
    async fn insert_registration(&self, registration: Registration) -> StoreResult<()>;

    async fn find_registration(&self, id: DocumentId) -> StoreResult<Option<Registration>>;

    async fn list_registrations(&self, filter: &RegistrationFilter) -> StoreResult<Vec<Registration>>;

    async fn update_registration(&self, id: DocumentId, patch: &RegistrationPatch) -> StoreResult<UpdateOutcome>;

    /// Delete and decrement the parent counter (floored at 0) atomically.
    ///
    /// Fails with [`StoreError::RegistrationNotFound`] or
    /// [`StoreError::EventNotFound`]; either way nothing is written.
    async fn delete_registration(&self, id: DocumentId) -> StoreResult<Registration>;

    /// Release connections. Called once on shutdown.
    async fn close(&self) {}
}
