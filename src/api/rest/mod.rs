pub mod board;
pub mod pricing;
pub mod roster;
pub mod ws;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::board::StatusCounts;
use crate::state::AppState;

/// The console's browser-facing surface. Anything not routed falls through
/// to the static assets in `static_dir`.
pub fn router(state: Arc<AppState>, static_dir: &str) -> Router {
    Router::new()
        .merge(board::router())
        .merge(roster::router())
        .merge(pricing::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    mounted: bool,
    counts: StatusCounts,
    last_refresh_error: Option<String>,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.board.snapshot().await;

    Json(HealthResponse {
        status: "ok",
        mounted: state.board.is_mounted().await,
        counts: snapshot.counts,
        last_refresh_error: snapshot.last_refresh_error,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
