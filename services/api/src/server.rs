use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rollcall::attendance::recorder::AttendanceRecorder;
use rollcall::attendance::router::AttendanceRouterState;
use rollcall::attendance::sessions::SessionRegistry;
use rollcall::config::AppConfig;
use rollcall::error::AppError;
use rollcall::events::EventSink;
use rollcall::messaging::{InboundMessageRouter, MessagingGateway, OutboundDispatcher};
use rollcall::photos::PhotoProvisioningService;
use rollcall::reports::ReportBuilder;
use rollcall::tasks::TaskGroup;
use rollcall::telemetry;
use rollcall::tokens::TokenIssuer;
use tokio::sync::{broadcast, mpsc};
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, BroadcastEventSink, InMemoryMediaStore, InMemoryRollcallStore, LoggingGateway,
    SvgTokenIssuer,
};
use crate::routes::{build_router, ApiContext};

const INBOUND_QUEUE_DEPTH: usize = 64;
const EVENT_STREAM_DEPTH: usize = 256;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryRollcallStore::default());
    let gateway: Arc<dyn MessagingGateway> = Arc::new(LoggingGateway::default());
    let dispatcher = Arc::new(OutboundDispatcher::new(gateway, config.messaging));
    let (events_tx, _) = broadcast::channel(EVENT_STREAM_DEPTH);
    let events: Arc<dyn EventSink> = Arc::new(BroadcastEventSink::new(events_tx.clone()));
    let tokens: Arc<dyn TokenIssuer> = Arc::new(SvgTokenIssuer);
    let tasks = TaskGroup::new();

    let photos = Arc::new(PhotoProvisioningService::new(
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        Arc::clone(&tokens),
        Arc::new(InMemoryMediaStore::default()),
        Arc::clone(&events),
        tasks.clone(),
    ));
    let recorder = Arc::new(AttendanceRecorder::new(
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        Arc::clone(&events),
        tasks.clone(),
    ));
    let registry = Arc::new(SessionRegistry::new(Arc::clone(&store)));
    let reports = Arc::new(ReportBuilder::new(Arc::clone(&store)));

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
    let inbound_router = Arc::new(InboundMessageRouter::new(
        Arc::clone(&store),
        Arc::clone(&photos),
    ));
    tokio::spawn(inbound_router.run(inbound_rx));

    let ctx = ApiContext {
        store,
        dispatcher,
        photos,
        reports,
        tokens,
        tasks,
        inbound: inbound_tx,
        events: events_tx,
    };
    let attendance = AttendanceRouterState {
        recorder,
        registry,
    };

    let app = build_router(ctx, attendance)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "attendance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
