use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::info;

use sprintspace_core::{DocumentId, RegistrationDraft, RegistrationFilter, RegistrationPatch, TitleSearch};

use crate::app::dto::{self, RegistrationListQuery, TitleQuery};
use crate::app::errors::ApiError;
use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn list_registrations(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<RegistrationListQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let filter = RegistrationFilter {
        user_email: dto::non_empty(query.email),
        event_id: None,
        title: TitleSearch::new(query.search.as_deref().unwrap_or_default())?,
    };
    let registrations = services.store.list_registrations(&filter).await?;
    Ok(Json(dto::registration_documents(&registrations)?))
}

/// Case-insensitive substring match on the event title. The input is
/// matched literally.
pub async fn search_registrations(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let filter = RegistrationFilter {
        title: TitleSearch::new(query.title.as_deref().unwrap_or_default())?,
        ..RegistrationFilter::default()
    };
    let registrations = services.store.list_registrations(&filter).await?;
    Ok(Json(dto::registration_documents(&registrations)?))
}

pub async fn get_registration(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let registration = services
        .store
        .find_registration(id)
        .await?
        .ok_or(ApiError::NotFound("registration"))?;
    Ok(Json(dto::registration_document(&registration)?))
}

/// Parent must exist; the store bumps its counter in the same step as the insert.
pub async fn create_registration(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let draft = RegistrationDraft::from_json(body)?;

    let parent = services
        .store
        .find_event(draft.event_id)
        .await?
        .ok_or(ApiError::NotFound("event"))?;

    let registration =
        draft.into_registration(DocumentId::new(), principal.email(), &parent.title, services.clock.now());
    let id = registration.id;
    services.store.insert_registration(registration).await?;

    info!(registration_id = %id, event_id = %parent.id, user = %principal.identity(), "registration created");
    Ok((StatusCode::CREATED, Json(dto::inserted(id))).into_response())
}

pub async fn update_registration(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let patch = RegistrationPatch::from_json(body)?;

    let outcome = services.store.update_registration(id, &patch).await?;
    if !outcome.matched {
        return Err(ApiError::NotFound("registration"));
    }

    info!(registration_id = %id, modified = outcome.modified, "registration updated");
    Ok(Json(dto::updated(outcome)))
}

pub async fn delete_registration(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let removed = services.store.delete_registration(id).await?;

    info!(registration_id = %id, event_id = %removed.event_id, "registration deleted");
    Ok(Json(dto::deleted(1)))
}
