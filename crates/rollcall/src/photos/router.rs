use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::service::{PhotoRequestError, PhotoRequestKind, PhotoProvisioningService};
use crate::attendance::domain::PersonId;
use crate::attendance::repository::RosterRepository;
use crate::messaging::DeliveryError;

/// Router builder exposing photo request, bulk request, and state reset.
pub fn photo_router<S>(service: Arc<PhotoProvisioningService<S>>) -> Router
where
    S: RosterRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/people/:person_id/photo-request",
            post(request_photo_handler::<S>),
        )
        .route(
            "/api/v1/people/photo-requests/bulk",
            post(bulk_request_handler::<S>),
        )
        .route(
            "/api/v1/people/:person_id/photo-request/reset",
            post(reset_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn request_photo_handler<S>(
    State(service): State<Arc<PhotoProvisioningService<S>>>,
    Path(person_id): Path<String>,
) -> Response
where
    S: RosterRepository + 'static,
{
    let person_id = PersonId(person_id);
    // Replacement wording when a photo is already stored, like the manual
    // admin flow; the state machine itself only cares about Pending.
    let kind = match service_kind(&service, &person_id) {
        Ok(kind) => kind,
        Err(err) => return photo_error_response(err),
    };
    match service.request_photo(&person_id, kind).await {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => photo_error_response(err),
    }
}

fn service_kind<S>(
    service: &PhotoProvisioningService<S>,
    person_id: &PersonId,
) -> Result<PhotoRequestKind, PhotoRequestError>
where
    S: RosterRepository + 'static,
{
    let person = service
        .person(person_id)?
        .ok_or(PhotoRequestError::NotFound)?;
    Ok(if person.photo.is_some() {
        PhotoRequestKind::Change
    } else {
        PhotoRequestKind::FollowUp
    })
}

pub(crate) async fn bulk_request_handler<S>(
    State(service): State<Arc<PhotoProvisioningService<S>>>,
) -> Response
where
    S: RosterRepository + 'static,
{
    match service.bulk_request_photo() {
        Ok(receipt) if receipt.selected == 0 => (
            StatusCode::OK,
            axum::Json(json!({
                "selected": 0,
                "message": "nobody currently qualifies for a photo request",
            })),
        )
            .into_response(),
        Ok(receipt) => (StatusCode::ACCEPTED, axum::Json(receipt)).into_response(),
        Err(err) => photo_error_response(err),
    }
}

pub(crate) async fn reset_handler<S>(
    State(service): State<Arc<PhotoProvisioningService<S>>>,
    Path(person_id): Path<String>,
) -> Response
where
    S: RosterRepository + 'static,
{
    match service.reset(&PersonId(person_id)) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({ "message": "photo request state reset" })),
        )
            .into_response(),
        Err(err) => photo_error_response(err),
    }
}

fn photo_error_response(err: PhotoRequestError) -> Response {
    let status = match &err {
        PhotoRequestError::NotFound => StatusCode::NOT_FOUND,
        PhotoRequestError::MissingContact => StatusCode::BAD_REQUEST,
        PhotoRequestError::AlreadyPending => StatusCode::CONFLICT,
        PhotoRequestError::Dispatch(DeliveryError::NotReady) => StatusCode::SERVICE_UNAVAILABLE,
        PhotoRequestError::Dispatch(DeliveryError::Upstream(_)) => StatusCode::BAD_GATEWAY,
        PhotoRequestError::Media(_) | PhotoRequestError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, axum::Json(json!({ "error": err.to_string() }))).into_response()
}
