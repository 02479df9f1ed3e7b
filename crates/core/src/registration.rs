//! Registrations: a user's enrollment in an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Attributes;
use crate::error::{DomainError, DomainResult};
use crate::fields;
use crate::id::DocumentId;
use crate::search::TitleSearch;

/// Keys a client may never change after creation.
const IMMUTABLE: &[&str] = &["_id", "eventId", "marathonId", "createdAt"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub event_id: DocumentId,
    pub user_email: String,
    /// Copy of the parent event's title, kept for search.
    pub event_title: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// A validated create request.
///
/// `event_title` is filled from the parent event when the client omits it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationDraft {
    pub event_id: DocumentId,
    pub user_email: Option<String>,
    pub event_title: Option<String>,
    pub attributes: Attributes,
}

impl RegistrationDraft {
    /// Parse a client document. The parent reference may be sent as
    /// `eventId` or `marathonId`.
    pub fn from_json(value: Value) -> DomainResult<Self> {
        let mut map = fields::into_object(value, "registration")?;
        map.remove("_id");
        map.remove("createdAt");

        let event_id = fields::take_id(&mut map, "eventId")?;
        let marathon_id = fields::take_id(&mut map, "marathonId")?;
        let event_id = event_id
            .or(marathon_id)
            .ok_or_else(|| DomainError::validation("eventId is required"))?;

        Ok(Self {
            event_id,
            user_email: fields::take_non_empty(&mut map, "userEmail")?,
            event_title: fields::take_string(&mut map, "eventTitle")?,
            attributes: map,
        })
    }

    pub fn into_registration(
        self,
        id: DocumentId,
        caller_email: &str,
        parent_title: &str,
        now: DateTime<Utc>,
    ) -> Registration {
        Registration {
            id,
            event_id: self.event_id,
            user_email: self.user_email.unwrap_or_else(|| caller_email.to_string()),
            event_title: self.event_title.unwrap_or_else(|| parent_title.to_string()),
            created_at: now,
            attributes: self.attributes,
        }
    }
}

/// A partial update. The parent link and identifier are immutable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationPatch {
    pub user_email: Option<String>,
    pub event_title: Option<String>,
    pub attributes: Attributes,
}

impl RegistrationPatch {
    pub fn from_json(value: Value) -> DomainResult<Self> {
        let mut map = fields::into_object(value, "registration update")?;
        fields::strip(&mut map, IMMUTABLE);

        Ok(Self {
            user_email: fields::take_non_empty(&mut map, "userEmail")?,
            event_title: fields::take_string(&mut map, "eventTitle")?,
            attributes: map,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.user_email.is_none() && self.event_title.is_none() && self.attributes.is_empty()
    }

    /// Apply to `registration`, returning whether anything changed.
    pub fn apply(&self, registration: &mut Registration) -> bool {
        let mut modified = false;

        if let Some(email) = &self.user_email {
            modified |= registration.user_email != *email;
            registration.user_email.clone_from(email);
        }
        if let Some(title) = &self.event_title {
            modified |= registration.event_title != *title;
            registration.event_title.clone_from(title);
        }
        for (key, value) in &self.attributes {
            if registration.attributes.get(key) != Some(value) {
                registration.attributes.insert(key.clone(), value.clone());
                modified = true;
            }
        }

        modified
    }
}

/// Registration listing filter. All present criteria must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationFilter {
    pub user_email: Option<String>,
    pub event_id: Option<DocumentId>,
    pub title: Option<TitleSearch>,
}

impl RegistrationFilter {
    pub fn matches(&self, registration: &Registration) -> bool {
        self.user_email
            .as_deref()
            .is_none_or(|email| registration.user_email.eq_ignore_ascii_case(email))
            && self.event_id.is_none_or(|id| registration.event_id == id)
            && self
                .title
                .as_ref()
                .is_none_or(|search| search.matches(&registration.event_title))
    }
}
