use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use sprintspace_core::{DocumentId, Event, Registration};
use sprintspace_infra::UpdateOutcome;

use crate::app::errors::ApiError;

// -------------------------
// Query DTOs
// -------------------------

/// `GET /events` query. Numbers stay raw strings so bad values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub email: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunningEventsQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistrationListQuery {
    pub email: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TitleQuery {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Treat `?email=` like an absent filter.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// -------------------------
// Response documents
// -------------------------

/// Event as sent to clients; older clients read the counter as
/// `totalRegistrations`.
pub fn event_document(event: &Event) -> Result<Value, ApiError> {
    let mut doc = to_document(event)?;
    doc["totalRegistrations"] = json!(event.total_registration_count);
    Ok(doc)
}

pub fn event_documents<'a>(events: impl IntoIterator<Item = &'a Event>) -> Result<Vec<Value>, ApiError> {
    events.into_iter().map(event_document).collect()
}

/// Registration as sent to clients; `marathonId` mirrors `eventId`.
pub fn registration_document(registration: &Registration) -> Result<Value, ApiError> {
    let mut doc = to_document(registration)?;
    doc["marathonId"] = json!(registration.event_id);
    Ok(doc)
}

pub fn registration_documents(registrations: &[Registration]) -> Result<Vec<Value>, ApiError> {
    registrations.iter().map(registration_document).collect()
}

fn to_document(value: &impl Serialize) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

// -------------------------
// Acknowledgement bodies
// -------------------------

pub fn inserted(id: DocumentId) -> Value {
    json!({ "acknowledged": true, "insertedId": id })
}

pub fn updated(outcome: UpdateOutcome) -> Value {
    json!({
        "acknowledged": true,
        "matchedCount": u8::from(outcome.matched),
        "modifiedCount": u8::from(outcome.modified),
    })
}

pub fn deleted(count: u64) -> Value {
    json!({ "acknowledged": true, "deletedCount": count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledgements_use_driver_field_names() {
        let id = DocumentId::new();
        assert_eq!(inserted(id)["insertedId"], id.to_string());

        let body = updated(UpdateOutcome {
            matched: true,
            modified: false,
        });
        assert_eq!(body["matchedCount"], 1);
        assert_eq!(body["modifiedCount"], 0);

        assert_eq!(deleted(1)["deletedCount"], 1);
    }

    #[test]
    fn documents_carry_legacy_field_names() {
        let now = chrono::Utc::now();
        let mut event = sprintspace_core::EventDraft::from_json(json!({
            "title": "City Marathon",
            "marathonStartDate": "2030-01-01",
        }))
        .unwrap()
        .into_event(DocumentId::new(), "owner@example.com", now);
        event.total_registration_count = 4;

        let doc = event_document(&event).unwrap();
        assert_eq!(doc["totalRegistrationCount"], 4);
        assert_eq!(doc["totalRegistrations"], 4);
        assert_eq!(doc["_id"], event.id.to_string());

        let registration = sprintspace_core::RegistrationDraft::from_json(json!({ "eventId": event.id }))
            .unwrap()
            .into_registration(DocumentId::new(), "runner@example.com", &event.title, now);
        let docs = registration_documents(std::slice::from_ref(&registration)).unwrap();
        assert_eq!(docs[0]["eventId"], event.id.to_string());
        assert_eq!(docs[0]["marathonId"], event.id.to_string());
    }

    #[test]
    fn blank_filters_are_dropped() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some(" a@b.c ".into())).as_deref(), Some("a@b.c"));
        assert_eq!(non_empty(None), None);
    }
}
