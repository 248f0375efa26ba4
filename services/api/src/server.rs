use crate::cli::ServeArgs;
use crate::infra::{http_backends, AppState, InMemoryDecisionRepository};
use crate::routes::with_filtering_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_filtering::config::AppConfig;
use loan_filtering::error::AppError;
use loan_filtering::screening::FilteringService;
use loan_filtering::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backends = http_backends(&config.pipeline)?;
    let repository = Arc::new(InMemoryDecisionRepository::default());
    let line_of_business = config.pipeline.line_of_business.clone();
    let filtering_service = Arc::new(FilteringService::new(
        repository,
        backends,
        config.pipeline.clone(),
    ));

    let app = with_filtering_routes(filtering_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, %line_of_business, "loan filtering service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
