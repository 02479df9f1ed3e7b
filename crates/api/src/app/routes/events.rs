use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use rand::seq::IndexedRandom;
use serde_json::{Value, json};
use tracing::info;

use sprintspace_auth::ensure_owner;
use sprintspace_core::{
    DocumentId, Event, EventDraft, EventFilter, EventPatch, Page, PageRequest, RegistrationFilter, SortOrder,
};

use crate::app::dto::{self, EventListQuery, RunningEventsQuery};
use crate::app::errors::ApiError;
use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Size of the random pick returned next to the running events.
const RANDOM_SAMPLE_SIZE: usize = 3;

/// Both `/events` and `/marathons` spellings are served.
pub fn public_router() -> Router {
    Router::new()
        .route("/events", get(list_events))
        .route("/marathons", get(list_events))
        .route("/events/details/:id", get(get_event))
        .route("/marathons/:id", get(get_event))
        .route("/running-events", get(running_events))
}

pub fn protected_router() -> Router {
    Router::new()
        .route("/events", post(create_event))
        .route("/marathons", post(create_event))
        .route("/events/:id", put(update_event).delete(delete_event))
        .route("/marathons/:id", put(update_event).delete(delete_event))
        .route("/marathons/:id/registrations", get(event_registrations))
}

pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Value>, ApiError> {
    let request = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        services.config.events_page_size,
    );
    let filter = EventFilter {
        owner_email: dto::non_empty(query.email),
        sort: SortOrder::from_query(query.sort.as_deref()),
    };

    let total = services.store.count_events(&filter).await?;
    let items = services.store.list_events(&filter, Some(request)).await?;
    let page = Page::new(items, total, request);

    let mut body = json!({
        "events": dto::event_documents(&page.items)?,
        "totalEvents": page.total,
        "totalPages": page.total_pages,
        "currentPage": page.current_page,
    });
    // The full match set is bounded to one owner's events.
    if filter.owner_email.is_some() {
        let mine = services.store.list_events(&filter, None).await?;
        body["myEvents"] = json!(dto::event_documents(&mine)?);
    }

    Ok(Json(body))
}

pub async fn get_event(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let event = find_event(&services, id).await?;
    Ok(Json(dto::event_document(&event)?))
}

/// Events starting after today, plus a uniform random pick of up to three.
pub async fn running_events(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<RunningEventsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = PageRequest::from_query(None, query.limit.as_deref(), services.config.running_events_limit).limit();
    let marathons = services.store.upcoming_events(services.clock.today(), limit).await?;

    let sample: Vec<&Event> = marathons
        .choose_multiple(&mut rand::rng(), RANDOM_SAMPLE_SIZE)
        .collect();

    Ok(Json(json!({
        "marathons": dto::event_documents(&marathons)?,
        "randomRunningEvents": dto::event_documents(sample)?,
    })))
}

pub async fn create_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let draft = EventDraft::from_json(body)?;

    let event = draft.into_event(DocumentId::new(), principal.email(), services.clock.now());
    let id = event.id;
    services.store.insert_event(event).await?;

    info!(event_id = %id, owner = %principal.identity(), "event created");
    Ok((StatusCode::CREATED, Json(dto::inserted(id))).into_response())
}

pub async fn update_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let patch = EventPatch::from_json(body)?;

    let existing = find_event(&services, id).await?;
    ensure_owner(principal.identity(), &existing.owner_email)?;

    let outcome = services.store.update_event(id, &patch).await?;
    info!(event_id = %id, modified = outcome.modified, "event updated");
    Ok(Json(dto::updated(outcome)))
}

pub async fn delete_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;

    let existing = find_event(&services, id).await?;
    ensure_owner(principal.identity(), &existing.owner_email)?;

    let deleted = services.store.delete_event(id).await?;
    info!(event_id = %id, deleted, "event deleted");
    Ok(Json(dto::deleted(u64::from(deleted))))
}

pub async fn event_registrations(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let id = parse_id(&id)?;
    let filter = RegistrationFilter {
        event_id: Some(id),
        ..RegistrationFilter::default()
    };
    let registrations = services.store.list_registrations(&filter).await?;
    Ok(Json(dto::registration_documents(&registrations)?))
}

async fn find_event(services: &AppServices, id: DocumentId) -> Result<Event, ApiError> {
    services
        .store
        .find_event(id)
        .await?
        .ok_or(ApiError::NotFound("event"))
}
