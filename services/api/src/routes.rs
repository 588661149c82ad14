use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router};
use chrono::{Local, NaiveDate};
use rollcall::attendance::domain::{Person, PersonId};
use rollcall::attendance::repository::{AttendanceRepository, RepositoryError, RosterRepository};
use rollcall::attendance::router::{attendance_router, AttendanceRouterState};
use rollcall::events::AdminEvent;
use rollcall::messaging::{
    DeliveryError, InboundMessageEvent, InboundPayload, MessageContent, OutboundDispatcher,
};
use rollcall::photos::messages::token_caption;
use rollcall::photos::{photo_router, PhotoProvisioningService, PhotoRequestKind};
use rollcall::reports::{RankingPeriod, ReportBuilder, ReportError};
use rollcall::tasks::TaskGroup;
use rollcall::tokens::TokenIssuer;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;
use uuid::Uuid;

use crate::infra::{AppState, InMemoryRollcallStore};

/// Everything the non-core endpoints need, shared through an extension.
#[derive(Clone)]
pub(crate) struct ApiContext {
    pub(crate) store: Arc<InMemoryRollcallStore>,
    pub(crate) dispatcher: Arc<OutboundDispatcher>,
    pub(crate) photos: Arc<PhotoProvisioningService<InMemoryRollcallStore>>,
    pub(crate) reports: Arc<ReportBuilder<InMemoryRollcallStore>>,
    pub(crate) tokens: Arc<dyn TokenIssuer>,
    pub(crate) tasks: TaskGroup,
    pub(crate) inbound: mpsc::Sender<InboundMessageEvent>,
    pub(crate) events: broadcast::Sender<AdminEvent>,
}

pub(crate) fn build_router(
    ctx: ApiContext,
    attendance: AttendanceRouterState<InMemoryRollcallStore>,
) -> Router {
    attendance_router(attendance)
        .merge(photo_router(Arc::clone(&ctx.photos)))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/people",
            axum::routing::get(list_people_endpoint).post(enroll_endpoint),
        )
        .route(
            "/api/v1/people/:person_id",
            axum::routing::get(fetch_person_endpoint)
                .put(update_person_endpoint)
                .delete(remove_person_endpoint),
        )
        .route(
            "/api/v1/people/:person_id/attendance",
            axum::routing::get(person_attendance_endpoint),
        )
        .route(
            "/api/v1/people/:person_id/token",
            axum::routing::get(token_image_endpoint),
        )
        .route(
            "/api/v1/people/:person_id/token/resend",
            axum::routing::post(resend_token_endpoint),
        )
        .route("/api/v1/broadcast", axum::routing::post(broadcast_endpoint))
        .route(
            "/api/v1/messaging/inbound",
            axum::routing::post(inbound_endpoint),
        )
        .route(
            "/api/v1/reports/daily",
            axum::routing::get(daily_report_endpoint),
        )
        .route(
            "/api/v1/reports/summary",
            axum::routing::get(summary_endpoint),
        )
        .route(
            "/api/v1/reports/monthly",
            axum::routing::get(monthly_recap_endpoint),
        )
        .route(
            "/api/v1/reports/rankings",
            axum::routing::get(rankings_endpoint),
        )
        .route(
            "/api/v1/events/stream",
            axum::routing::get(events_stream_endpoint),
        )
        .layer(Extension(ctx))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollRequest {
    name: String,
    #[serde(default)]
    contact: Option<String>,
}

pub(crate) async fn list_people_endpoint(Extension(ctx): Extension<ApiContext>) -> Response {
    match ctx.store.list_people() {
        Ok(mut people) => {
            people.sort_by(|a, b| a.name.cmp(&b.name));
            (StatusCode::OK, Json(people)).into_response()
        }
        Err(err) => repository_error_response(err),
    }
}

/// Enrolls a person and kicks off the welcome exchange in the background:
/// first the personal token image, then the first-time photo request.
pub(crate) async fn enroll_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Json(request): Json<EnrollRequest>,
) -> Response {
    let name = request.name.trim();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "name must not be empty" })),
        )
            .into_response();
    }

    let id = PersonId(format!("person-{}", Uuid::new_v4()));
    let person = Person::new(id, name, request.contact);
    match ctx.store.insert_person(person) {
        Ok(person) => {
            if person.contact().is_some() {
                let tasks = ctx.tasks.clone();
                let enrolled = person.clone();
                tasks.spawn(async move {
                    welcome_new_person(ctx, enrolled).await;
                });
            }
            (StatusCode::CREATED, Json(person)).into_response()
        }
        Err(err) => repository_error_response(err),
    }
}

async fn welcome_new_person(ctx: ApiContext, person: Person) {
    let Some(contact) = person.contact() else {
        return;
    };

    match ctx.tokens.issue(&person) {
        Ok(image) => {
            let content = MessageContent::Image {
                bytes: image.bytes,
                caption: token_caption(&person.name, false),
            };
            if let Err(err) = ctx.dispatcher.send_single(contact, &content).await {
                warn!(person = %person.name, error = %err, "welcome token not delivered");
                return;
            }
        }
        Err(err) => {
            warn!(person = %person.name, error = %err, "token composition failed at enrollment");
            return;
        }
    }

    if person.photo.is_none() {
        if let Err(err) = ctx
            .photos
            .request_photo(&person.id, PhotoRequestKind::FirstTime)
            .await
        {
            warn!(person = %person.name, error = %err, "first-time photo request failed");
        }
    }
}

pub(crate) async fn fetch_person_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Path(person_id): Path<String>,
) -> Response {
    match ctx.store.fetch_person(&PersonId(person_id)) {
        Ok(Some(person)) => (StatusCode::OK, Json(person)).into_response(),
        Ok(None) => person_not_found(),
        Err(err) => repository_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdatePersonRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    contact: Option<String>,
}

pub(crate) async fn update_person_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Path(person_id): Path<String>,
    Json(request): Json<UpdatePersonRequest>,
) -> Response {
    let mut person = match ctx.store.fetch_person(&PersonId(person_id)) {
        Ok(Some(person)) => person,
        Ok(None) => return person_not_found(),
        Err(err) => return repository_error_response(err),
    };

    if let Some(name) = request.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "name must not be empty" })),
            )
                .into_response();
        }
        person.name = name;
    }
    if let Some(contact) = request.contact {
        person.contact = Some(contact);
    }

    match ctx.store.update_person(person.clone()) {
        Ok(()) => (StatusCode::OK, Json(person)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn person_attendance_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Path(person_id): Path<String>,
) -> Response {
    let id = PersonId(person_id);
    match ctx.store.fetch_person(&id) {
        Ok(Some(_)) => {}
        Ok(None) => return person_not_found(),
        Err(err) => return repository_error_response(err),
    }
    match ctx.store.records_for_person(&id) {
        Ok(mut records) => {
            records.sort_by(|a, b| b.date.cmp(&a.date));
            (StatusCode::OK, Json(records)).into_response()
        }
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn remove_person_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Path(person_id): Path<String>,
) -> Response {
    match ctx.store.remove_person(&PersonId(person_id)) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "person removed" })),
        )
            .into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn token_image_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Path(person_id): Path<String>,
) -> Response {
    let person = match ctx.store.fetch_person(&PersonId(person_id)) {
        Ok(Some(person)) => person,
        Ok(None) => return person_not_found(),
        Err(err) => return repository_error_response(err),
    };
    match ctx.tokens.issue(&person) {
        Ok(image) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, image.mime)],
            image.bytes,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

pub(crate) async fn resend_token_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Path(person_id): Path<String>,
) -> Response {
    let person = match ctx.store.fetch_person(&PersonId(person_id)) {
        Ok(Some(person)) => person,
        Ok(None) => return person_not_found(),
        Err(err) => return repository_error_response(err),
    };
    let Some(contact) = person.contact() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "person has no registered contact address" })),
        )
            .into_response();
    };

    let image = match ctx.tokens.issue(&person) {
        Ok(image) => image,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    };
    let content = MessageContent::Image {
        bytes: image.bytes,
        caption: token_caption(&person.name, false),
    };
    match ctx.dispatcher.send_single(contact, &content).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": format!("token re-sent to {}", person.name) })),
        )
            .into_response(),
        Err(err) => delivery_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BroadcastRequest {
    message: String,
}

/// Sends one message to every registered contact, sequentially and paced.
/// The response reports per-recipient success and failure counts.
pub(crate) async fn broadcast_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Json(request): Json<BroadcastRequest>,
) -> Response {
    let message = request.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "message must not be empty" })),
        )
            .into_response();
    }

    let contacts = match ctx.store.contacts() {
        Ok(contacts) => contacts,
        Err(err) => return repository_error_response(err),
    };
    if contacts.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "nobody has a registered contact address" })),
        )
            .into_response();
    }

    match ctx.dispatcher.send_broadcast(&contacts, message).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => delivery_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InboundRequest {
    sender: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    media: Option<Vec<u8>>,
}

/// Webhook for the messaging platform. Events are queued for the inbound
/// router; processing happens off the request path.
pub(crate) async fn inbound_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Json(request): Json<InboundRequest>,
) -> Response {
    let payload = match (request.media, request.text) {
        (Some(bytes), _) => InboundPayload::Media(bytes),
        (None, Some(text)) => InboundPayload::Text(text),
        (None, None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "either text or media is required" })),
            )
                .into_response()
        }
    };

    let event = InboundMessageEvent {
        sender: request.sender,
        payload,
    };
    match ctx.inbound.send(event).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "accepted" })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "inbound pipeline is not running" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DailyReportParams {
    #[serde(default)]
    date: Option<NaiveDate>,
}

pub(crate) async fn daily_report_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Query(params): Query<DailyReportParams>,
) -> Response {
    let date = params.date.unwrap_or_else(|| Local::now().date_naive());
    match ctx.reports.daily_overview(date) {
        Ok(overview) => (
            StatusCode::OK,
            Json(json!({ "date": date, "people": overview })),
        )
            .into_response(),
        Err(err) => report_error_response(err),
    }
}

pub(crate) async fn summary_endpoint(Extension(ctx): Extension<ApiContext>) -> Response {
    let today = Local::now().date_naive();
    match ctx.reports.dashboard_summary(today) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => report_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MonthlyRecapParams {
    year: i32,
    month: u32,
    #[serde(default)]
    format: Option<String>,
}

pub(crate) async fn monthly_recap_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Query(params): Query<MonthlyRecapParams>,
) -> Response {
    let recap = match ctx.reports.monthly_recap(params.year, params.month) {
        Ok(recap) => recap,
        Err(err) => return report_error_response(err),
    };

    if params.format.as_deref() == Some("csv") {
        return match recap.to_csv() {
            Ok(csv) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!(
                            "attachment; filename=\"recap-{}-{:02}.csv\"",
                            recap.year, recap.month
                        ),
                    ),
                ],
                csv,
            )
                .into_response(),
            Err(err) => report_error_response(err),
        };
    }
    (StatusCode::OK, Json(recap)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct RankingParams {
    #[serde(default)]
    period: Option<RankingPeriod>,
}

pub(crate) async fn rankings_endpoint(
    Extension(ctx): Extension<ApiContext>,
    Query(params): Query<RankingParams>,
) -> Response {
    let period = params.period.unwrap_or(RankingPeriod::Weekly);
    let today = Local::now().date_naive();
    match ctx.reports.rankings(period, today) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => report_error_response(err),
    }
}

/// Live administrative event stream for dashboards.
pub(crate) async fn events_stream_endpoint(
    Extension(ctx): Extension<ApiContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(ctx.events.subscribe()).filter_map(|event| match event {
        Ok(event) => Event::default().json_data(&event).ok().map(Ok),
        // Lagged receivers skip to the live edge.
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn person_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "person not found" })),
    )
        .into_response()
}

fn repository_error_response(err: RepositoryError) -> Response {
    let status = match &err {
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn delivery_error_response(err: DeliveryError) -> Response {
    let status = match &err {
        DeliveryError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        DeliveryError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn report_error_response(err: ReportError) -> Response {
    let status = match &err {
        ReportError::InvalidMonth => StatusCode::BAD_REQUEST,
        ReportError::Repository(_) | ReportError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use rollcall::attendance::domain::PhotoRequestState;
    use rollcall::attendance::recorder::AttendanceRecorder;
    use rollcall::attendance::sessions::SessionRegistry;
    use rollcall::config::PacingConfig;
    use rollcall::events::NullEventSink;
    use rollcall::messaging::MessagingGateway;
    use std::sync::Mutex;
    use tower::util::ServiceExt;

    use crate::infra::{InMemoryMediaStore, SvgTokenIssuer};

    struct RecordingGateway {
        sent: Mutex<Vec<(String, MessageContent)>>,
    }

    impl Default for RecordingGateway {
        fn default() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl RecordingGateway {
        fn sent(&self) -> Vec<(String, MessageContent)> {
            self.sent.lock().expect("sent mutex poisoned").clone()
        }
    }

    #[async_trait::async_trait]
    impl MessagingGateway for RecordingGateway {
        fn is_ready(&self) -> bool {
            true
        }

        async fn send(
            &self,
            address: &str,
            content: &MessageContent,
        ) -> Result<(), DeliveryError> {
            self.sent
                .lock()
                .expect("sent mutex poisoned")
                .push((address.to_string(), content.clone()));
            Ok(())
        }
    }

    struct Harness {
        store: Arc<InMemoryRollcallStore>,
        gateway: Arc<RecordingGateway>,
        tasks: TaskGroup,
        inbox: mpsc::Receiver<InboundMessageEvent>,
        router: Router,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryRollcallStore::default());
        let gateway = Arc::new(RecordingGateway::default());
        let dispatcher = Arc::new(OutboundDispatcher::new(
            Arc::clone(&gateway) as Arc<dyn MessagingGateway>,
            PacingConfig::immediate(),
        ));
        let tasks = TaskGroup::new();
        let events = Arc::new(NullEventSink);
        let tokens: Arc<dyn TokenIssuer> = Arc::new(SvgTokenIssuer);
        let photos = Arc::new(PhotoProvisioningService::new(
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            Arc::clone(&tokens),
            Arc::new(InMemoryMediaStore::default()),
            events.clone(),
            tasks.clone(),
        ));
        let reports = Arc::new(ReportBuilder::new(Arc::clone(&store)));
        let (inbound_tx, inbox) = mpsc::channel(8);
        let (events_tx, _) = broadcast::channel(16);

        let ctx = ApiContext {
            store: Arc::clone(&store),
            dispatcher: Arc::clone(&dispatcher),
            photos: Arc::clone(&photos),
            reports,
            tokens,
            tasks: tasks.clone(),
            inbound: inbound_tx,
            events: events_tx,
        };
        let attendance = AttendanceRouterState {
            recorder: Arc::new(AttendanceRecorder::new(
                Arc::clone(&store),
                dispatcher,
                events,
                tasks.clone(),
            )),
            registry: Arc::new(SessionRegistry::new(Arc::clone(&store))),
        };
        let router = build_router(ctx, attendance);

        Harness {
            store,
            gateway,
            tasks,
            inbox,
            router,
        }
    }

    fn json_request(method: &str, uri: &str, payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request built")
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn enrollment_sends_token_and_first_time_photo_request() {
        let harness = harness();

        let response = harness
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/people",
                json!({ "name": "Ana", "contact": "628111" }),
            ))
            .await
            .expect("enroll request");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response_json(response).await;
        let id = body["id"].as_str().expect("person id").to_string();
        assert!(id.starts_with("person-"));

        harness.tasks.wait_idle().await;
        let sent = harness.gateway.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(sent[0].1, MessageContent::Image { .. }));
        assert!(matches!(sent[1].1, MessageContent::Text(_)));
        assert_eq!(
            harness
                .store
                .fetch_person(&PersonId(id))
                .expect("fetch succeeds")
                .expect("person present")
                .photo_request_state,
            PhotoRequestState::Pending
        );
    }

    #[tokio::test]
    async fn enrollment_rejects_blank_name() {
        let harness = harness();

        let response = harness
            .router
            .oneshot(json_request(
                "POST",
                "/api/v1/people",
                json!({ "name": "  " }),
            ))
            .await
            .expect("enroll request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_person_changes_name_and_contact() {
        let harness = harness();
        harness
            .store
            .insert_person(Person::new(PersonId("p1".to_string()), "Ana", None))
            .expect("person inserted");

        let response = harness
            .router
            .oneshot(json_request(
                "PUT",
                "/api/v1/people/p1",
                json!({ "name": "Ana Putri", "contact": "628111" }),
            ))
            .await
            .expect("update request");

        assert_eq!(response.status(), StatusCode::OK);
        let updated = harness
            .store
            .fetch_person(&PersonId("p1".to_string()))
            .expect("fetch succeeds")
            .expect("person present");
        assert_eq!(updated.name, "Ana Putri");
        assert_eq!(updated.contact(), Some("628111"));
    }

    #[tokio::test]
    async fn broadcast_without_contacts_is_not_found() {
        let harness = harness();

        let response = harness
            .router
            .oneshot(json_request(
                "POST",
                "/api/v1/broadcast",
                json!({ "message": "halo" }),
            ))
            .await
            .expect("broadcast request");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn broadcast_reports_delivery_counts() {
        let harness = harness();
        for (id, name, contact) in [("p1", "Ana", "628111"), ("p2", "Budi", "628222")] {
            harness
                .store
                .insert_person(Person::new(
                    PersonId(id.to_string()),
                    name,
                    Some(contact.to_string()),
                ))
                .expect("person inserted");
        }

        let response = harness
            .router
            .oneshot(json_request(
                "POST",
                "/api/v1/broadcast",
                json!({ "message": "Pengumuman: besok libur." }),
            ))
            .await
            .expect("broadcast request");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["success_count"], 2);
        assert_eq!(body["fail_count"], 0);
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn inbound_webhook_queues_the_event() {
        let mut harness = harness();

        let response = harness
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/messaging/inbound",
                json!({ "sender": "628111", "text": "tidak" }),
            ))
            .await
            .expect("inbound request");
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let event = harness.inbox.recv().await.expect("event queued");
        assert_eq!(event.sender, "628111");
        assert_eq!(event.payload, InboundPayload::Text("tidak".to_string()));
    }

    #[tokio::test]
    async fn inbound_webhook_rejects_empty_events() {
        let harness = harness();

        let response = harness
            .router
            .oneshot(json_request(
                "POST",
                "/api/v1/messaging/inbound",
                json!({ "sender": "628111" }),
            ))
            .await
            .expect("inbound request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn token_image_endpoint_serves_the_artifact() {
        let harness = harness();
        harness
            .store
            .insert_person(Person::new(PersonId("p1".to_string()), "Ana", None))
            .expect("person inserted");

        let response = harness
            .router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/people/p1/token")
                    .body(Body::empty())
                    .expect("request built"),
            )
            .await
            .expect("token request");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "image/svg+xml"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read");
        assert!(String::from_utf8_lossy(&bytes).contains("p1"));
    }

    #[tokio::test]
    async fn monthly_recap_endpoint_exports_csv() {
        let harness = harness();
        harness
            .store
            .insert_person(Person::new(PersonId("p1".to_string()), "Ana", None))
            .expect("person inserted");

        let response = harness
            .router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/reports/monthly?year=2025&month=9&format=csv")
                    .body(Body::empty())
                    .expect("request built"),
            )
            .await
            .expect("recap request");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read");
        assert!(String::from_utf8_lossy(&bytes).starts_with("Name,1,2,"));
    }

    #[tokio::test]
    async fn daily_report_lists_the_roster() {
        let harness = harness();
        harness
            .store
            .insert_person(Person::new(PersonId("p1".to_string()), "Ana", None))
            .expect("person inserted");

        let response = harness
            .router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/reports/daily?date=2025-09-01")
                    .body(Body::empty())
                    .expect("request built"),
            )
            .await
            .expect("daily request");

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["date"], "2025-09-01");
        assert_eq!(body["people"].as_array().expect("people array").len(), 1);
        assert!(body["people"][0]["status"].is_null());
    }
}
