use std::sync::Arc;

use dispatch_console::api;
use dispatch_console::board::BoardSettings;
use dispatch_console::config::Config;
use dispatch_console::error::AppError;
use dispatch_console::gateway::HttpGateway;
use dispatch_console::maps::GebetaClient;
use dispatch_console::observability::metrics::Metrics;
use dispatch_console::pricing::PriceTable;
use dispatch_console::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let metrics = Metrics::new();
    let gateway = HttpGateway::new(&config.backend_url, config.request_timeout, metrics.clone())?;
    let maps = GebetaClient::new(
        &config.map_api_url,
        config.map_api_key.clone(),
        config.request_timeout,
        metrics.clone(),
    )?;
    if config.map_api_key.is_empty() {
        tracing::warn!("MAP_API_KEY is not set, place search and price estimates will fail");
    }

    let prices = PriceTable::with_top_tier(config.price_top_tier)?;
    let settings = BoardSettings {
        page_size: config.page_size,
        alert_duration: config.new_delivery_alert,
        detection: config.new_delivery_detection,
    };

    let shared_state = Arc::new(AppState::new(
        Arc::new(gateway),
        Arc::new(maps),
        prices,
        settings,
        config.poll_interval,
        config.event_buffer_size,
        metrics,
    )?);

    shared_state.board.mount().await;

    let app = api::rest::router(shared_state.clone(), &config.static_dir);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        backend_url = %config.backend_url,
        detection = %config.new_delivery_detection,
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    shared_state.board.unmount().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
