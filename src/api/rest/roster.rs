use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};

use crate::api::rest::board::{Confirmation, Notice};
use crate::error::AppError;
use crate::models::driver::{Driver, DriverFields, DriverId};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/roster/drivers", get(list_drivers).post(create_driver))
        .route("/roster/drivers/:id", put(update_driver).delete(delete_driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Driver>>, AppError> {
    let drivers = state.roster.load().await?;
    state.board.set_drivers(drivers.clone()).await;
    Ok(Json(drivers))
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DriverFields>,
) -> Result<Json<Driver>, AppError> {
    let driver = state.roster.add(payload).await?;
    sync_board(&state).await;
    Ok(Json(driver))
}

async fn update_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DriverId>,
    Json(payload): Json<DriverFields>,
) -> Result<Json<Driver>, AppError> {
    let driver = state.roster.edit(id, payload).await?;
    sync_board(&state).await;
    Ok(Json(driver))
}

async fn delete_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DriverId>,
    Query(confirmation): Query<Confirmation>,
) -> Result<Json<Notice>, AppError> {
    let result = state.roster.delete(id, confirmation.confirm).await;
    sync_board(&state).await;

    let message = if result? {
        "Driver deleted."
    } else {
        "Deletion cancelled."
    };
    Ok(Json(Notice::from(message.to_string())))
}

async fn sync_board(state: &AppState) {
    if let Some(drivers) = state.roster.loaded_drivers().await {
        state.board.set_drivers(drivers).await;
    }
}
