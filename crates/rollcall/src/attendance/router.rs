use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AttendanceStatus, PersonId, SessionId};
use super::recorder::{AttendanceError, AttendanceRecorder};
use super::repository::{AttendanceRepository, RosterRepository, SessionRepository};
use super::sessions::{SessionError, SessionRegistry};

/// Shared state for the attendance endpoints.
pub struct AttendanceRouterState<S> {
    pub recorder: Arc<AttendanceRecorder<S>>,
    pub registry: Arc<SessionRegistry<S>>,
}

impl<S> Clone for AttendanceRouterState<S> {
    fn clone(&self) -> Self {
        Self {
            recorder: Arc::clone(&self.recorder),
            registry: Arc::clone(&self.registry),
        }
    }
}

/// Router builder exposing scan, manual entry, cancellation, and session
/// administration. Each endpoint maps 1:1 to a core operation.
pub fn attendance_router<S>(state: AttendanceRouterState<S>) -> Router
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    Router::new()
        .route("/api/v1/attendance/scan", post(scan_handler::<S>))
        .route("/api/v1/attendance/manual", post(manual_handler::<S>))
        .route("/api/v1/attendance", delete(cancel_handler::<S>))
        .route(
            "/api/v1/sessions",
            get(list_sessions_handler::<S>).post(create_session_handler::<S>),
        )
        .route(
            "/api/v1/sessions/active",
            get(active_session_handler::<S>),
        )
        .route(
            "/api/v1/sessions/:session_id/activate",
            put(activate_session_handler::<S>),
        )
        .route(
            "/api/v1/sessions/:session_id",
            delete(delete_session_handler::<S>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScanRequest {
    person_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManualRequest {
    person_id: String,
    status: AttendanceStatus,
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CancelRequest {
    person_id: String,
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateSessionRequest {
    name: String,
    late_threshold: NaiveTime,
}

pub(crate) async fn scan_handler<S>(
    State(state): State<AttendanceRouterState<S>>,
    axum::Json(request): axum::Json<ScanRequest>,
) -> Response
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    let person_id = PersonId(request.person_id);
    match state
        .recorder
        .scan(&person_id, Local::now().naive_local())
    {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => attendance_error_response(err),
    }
}

pub(crate) async fn manual_handler<S>(
    State(state): State<AttendanceRouterState<S>>,
    axum::Json(request): axum::Json<ManualRequest>,
) -> Response
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    let person_id = PersonId(request.person_id);
    match state.recorder.manual_set(
        &person_id,
        request.status,
        request.date,
        Local::now().naive_local(),
    ) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => attendance_error_response(err),
    }
}

pub(crate) async fn cancel_handler<S>(
    State(state): State<AttendanceRouterState<S>>,
    axum::Json(request): axum::Json<CancelRequest>,
) -> Response
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    let person_id = PersonId(request.person_id);
    match state.recorder.cancel(&person_id, request.date) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({ "message": "attendance record cancelled" })),
        )
            .into_response(),
        Err(err) => attendance_error_response(err),
    }
}

pub(crate) async fn list_sessions_handler<S>(
    State(state): State<AttendanceRouterState<S>>,
) -> Response
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    match state.registry.list() {
        Ok(sessions) => (StatusCode::OK, axum::Json(sessions)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn active_session_handler<S>(
    State(state): State<AttendanceRouterState<S>>,
) -> Response
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    match state.registry.active() {
        Ok(Some(session)) => (StatusCode::OK, axum::Json(session)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": "no session is active" })),
        )
            .into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn create_session_handler<S>(
    State(state): State<AttendanceRouterState<S>>,
    axum::Json(request): axum::Json<CreateSessionRequest>,
) -> Response
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    match state
        .registry
        .create(&request.name, request.late_threshold)
    {
        Ok(session) => (StatusCode::CREATED, axum::Json(session)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn activate_session_handler<S>(
    State(state): State<AttendanceRouterState<S>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    match state.registry.activate(&SessionId(session_id)) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub(crate) async fn delete_session_handler<S>(
    State(state): State<AttendanceRouterState<S>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: RosterRepository + SessionRepository + AttendanceRepository + 'static,
{
    match state.registry.delete(&SessionId(session_id)) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({ "message": "session deleted" })),
        )
            .into_response(),
        Err(err) => session_error_response(err),
    }
}

fn attendance_error_response(err: AttendanceError) -> Response {
    let status = match &err {
        AttendanceError::NoActiveSession => StatusCode::BAD_REQUEST,
        AttendanceError::PersonNotFound | AttendanceError::RecordNotFound => StatusCode::NOT_FOUND,
        AttendanceError::AlreadyRecorded { .. } => StatusCode::CONFLICT,
        AttendanceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, axum::Json(json!({ "error": err.to_string() }))).into_response()
}

fn session_error_response(err: SessionError) -> Response {
    let status = match &err {
        SessionError::EmptyName => StatusCode::BAD_REQUEST,
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::ActiveSessionProtected | SessionError::SessionInUse => StatusCode::CONFLICT,
        SessionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, axum::Json(json!({ "error": err.to_string() }))).into_response()
}
