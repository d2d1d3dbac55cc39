use crate::cli::ServeArgs;
use crate::infra::{load_dataset, AppState};
use crate::routes::with_portfolio_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_insight::config::AppConfig;
use loan_insight::error::AppError;
use loan_insight::portfolio::{PortfolioAnalyzer, PortfolioService};
use loan_insight::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let dataset = load_dataset(&config, None)?;
    info!(source = %dataset.version().source, rows = dataset.len(), "loan dataset loaded");

    let service = Arc::new(PortfolioService::new(
        dataset,
        PortfolioAnalyzer::new(config.analysis),
    ));

    let app = with_portfolio_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan insight service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
