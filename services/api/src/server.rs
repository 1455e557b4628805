use crate::cli::ServeArgs;
use crate::infra::{build_components, AppState};
use crate::routes::with_helpdesk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use helpdesk::config::AppConfig;
use helpdesk::dashboard::DashboardState;
use helpdesk::error::AppError;
use helpdesk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let dashboard = DashboardState::new(build_components(&config).await?);

    let app = with_helpdesk_routes(dashboard)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        provider = %config.knowledge.provider,
        embeddings = %config.knowledge.embedding_provider,
        "admissions helpdesk ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
