use crate::cli::ServeArgs;
use crate::infra::{AppState, SharedDataset};
use crate::routes::router;
use axum_prometheus::PrometheusMetricLayer;
use conta_comigo::config::AppConfig;
use conta_comigo::error::AppError;
use conta_comigo::telemetry;
use conta_comigo::vacancies::sources::{HttpFetcher, SourceFetcher};
use conta_comigo::vacancies::{DatasetCache, DatasetLoader};
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

    let fetcher: Box<dyn SourceFetcher> =
        Box::new(HttpFetcher::new(config.sources.request_timeout));
    let loader = DatasetLoader::from_config(fetcher, config.sources.clone())?;
    let source_url: Arc<str> = Arc::from(loader.sources().vacancy_url.as_str());
    let dataset: SharedDataset = Arc::new(DatasetCache::new(loader));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        dataset: dataset.clone(),
        dashboard: config.dashboard,
        source_url,
    };

    let app = router(app_state).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);
    preload(dataset);

    info!(?config.environment, %addr, "conta comigo dashboard listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Warms the snapshot so the first visitor does not pay for the fetch.
fn preload(dataset: SharedDataset) {
    tokio::spawn(async move {
        if dataset.get_or_load().await.is_ok() {
            info!("vacancy dataset preloaded");
        }
    });
}
