//! `sprintspace-core` — domain building blocks for events and registrations.
//!
//! This crate contains **pure domain** code (no HTTP, no storage).

pub mod error;
pub mod event;
mod fields;
pub mod id;
pub mod pagination;
pub mod registration;
pub mod search;

pub use error::{DomainError, DomainResult};
pub use event::{Event, EventDraft, EventFilter, EventPatch, SortOrder};
pub use id::DocumentId;
pub use pagination::{Page, PageRequest};
pub use registration::{Registration, RegistrationDraft, RegistrationFilter, RegistrationPatch};
pub use search::TitleSearch;

/// Free-form document attributes carried alongside the typed fields.
pub type Attributes = serde_json::Map<String, serde_json::Value>;
