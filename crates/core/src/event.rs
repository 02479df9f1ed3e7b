//! Events (a.k.a. marathons): registrable activities with an owner and a start date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Attributes;
use crate::error::{DomainError, DomainResult};
use crate::fields;
use crate::id::DocumentId;

/// Keys a client may never set on an event.
const SERVER_OWNED: &[&str] = &[
    "_id",
    "userEmail",
    "createdAt",
    "totalRegistrationCount",
    "totalRegistrations",
];

/// A stored event.
///
/// `total_registration_count` is derived: only registration create/delete
/// changes it, and it never goes below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(rename = "userEmail")]
    pub owner_email: String,
    pub title: String,
    #[serde(rename = "marathonStartDate")]
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub total_registration_count: u64,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Event {
    /// Whether the event starts strictly after `today`.
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.start_date > today
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        self.owner_email.eq_ignore_ascii_case(email)
    }
}

/// A validated create request.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub start_date: NaiveDate,
    pub attributes: Attributes,
}

impl EventDraft {
    /// Parse a client document. `title` and `marathonStartDate` are required;
    /// server-owned keys are discarded and everything else is kept as attributes.
    pub fn from_json(value: Value) -> DomainResult<Self> {
        let mut map = fields::into_object(value, "event")?;
        fields::strip(&mut map, SERVER_OWNED);

        let title = fields::take_non_empty(&mut map, "title")?
            .ok_or_else(|| DomainError::validation("title is required"))?;
        let start_date = fields::take_date(&mut map, "marathonStartDate")?
            .ok_or_else(|| DomainError::validation("marathonStartDate is required"))?;

        Ok(Self {
            title,
            start_date,
            attributes: map,
        })
    }

    pub fn into_event(self, id: DocumentId, owner_email: impl Into<String>, now: DateTime<Utc>) -> Event {
        Event {
            id,
            owner_email: owner_email.into(),
            title: self.title,
            start_date: self.start_date,
            created_at: now,
            total_registration_count: 0,
            attributes: self.attributes,
        }
    }
}

/// A partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub attributes: Attributes,
}

impl EventPatch {
    pub fn from_json(value: Value) -> DomainResult<Self> {
        let mut map = fields::into_object(value, "event update")?;
        fields::strip(&mut map, SERVER_OWNED);

        Ok(Self {
            title: fields::take_non_empty(&mut map, "title")?,
            start_date: fields::take_date(&mut map, "marathonStartDate")?,
            attributes: map,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start_date.is_none() && self.attributes.is_empty()
    }

    /// Apply to `event`, returning whether anything changed.
    pub fn apply(&self, event: &mut Event) -> bool {
        let mut modified = false;

        if let Some(title) = &self.title {
            modified |= event.title != *title;
            event.title.clone_from(title);
        }
        if let Some(date) = self.start_date {
            modified |= event.start_date != date;
            event.start_date = date;
        }
        for (key, value) in &self.attributes {
            if event.attributes.get(key) != Some(value) {
                event.attributes.insert(key.clone(), value.clone());
                modified = true;
            }
        }

        modified
    }
}

/// Listing order by creation time.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` (any case) sorts newest first; anything else is ascending.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }
}

/// Event listing filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub owner_email: Option<String>,
    pub sort: SortOrder,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        self.owner_email
            .as_deref()
            .is_none_or(|email| event.is_owned_by(email))
    }
}
