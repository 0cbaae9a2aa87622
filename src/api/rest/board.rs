use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use serde::{Deserialize, Serialize};

use crate::board::BoardSnapshot;
use crate::error::AppError;
use crate::models::delivery::{DeliveryId, DeliveryStatus, DeliveryType, NewDelivery};
use crate::models::driver::DriverId;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/board", get(get_board))
        .route("/board/filter", post(set_filter))
        .route("/board/page", post(set_page))
        .route("/board/refresh", post(refresh))
        .route("/board/deliveries/:id", delete(delete_delivery))
        .route("/board/deliveries/:id/successful", post(mark_successful))
        .route("/board/deliveries/:id/unsuccessful", post(mark_unsuccessful))
        .route("/board/deliveries/:id/price", post(set_price))
        .route("/board/deliveries/:id/delivery_type", post(set_delivery_type))
        .route("/board/deliveries/:id/assign", post(assign_driver))
        .route("/board/deliveries/:id/notify", post(notify_driver))
        .route("/deliveries", post(add_delivery))
}

/// User-facing confirmation text for a completed action.
#[derive(Debug, Serialize)]
pub struct Notice {
    pub message: String,
}

impl From<String> for Notice {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[derive(Deserialize)]
pub struct FilterRequest {
    pub status: DeliveryStatus,
}

#[derive(Deserialize)]
pub struct PageRequest {
    pub page: usize,
}

#[derive(Deserialize)]
pub struct UnsuccessfulRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct PriceRequest {
    pub price: u32,
}

#[derive(Deserialize)]
pub struct DeliveryTypeRequest {
    pub delivery_type: DeliveryType,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub driver_id: String,
}

#[derive(Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub confirm: bool,
}

async fn get_board(State(state): State<Arc<AppState>>) -> Json<BoardSnapshot> {
    Json(state.board.snapshot().await)
}

async fn set_filter(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FilterRequest>,
) -> Json<BoardSnapshot> {
    Json(state.board.set_filter(payload.status).await)
}

async fn set_page(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PageRequest>,
) -> Result<Json<BoardSnapshot>, AppError> {
    Ok(Json(state.board.set_page(payload.page).await?))
}

async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<BoardSnapshot>, AppError> {
    state.board.refresh().await?;
    Ok(Json(state.board.snapshot().await))
}

async fn mark_successful(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DeliveryId>,
) -> Result<Json<Notice>, AppError> {
    Ok(Json(state.board.mark_successful(id).await?.into()))
}

async fn mark_unsuccessful(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DeliveryId>,
    Json(payload): Json<UnsuccessfulRequest>,
) -> Result<Json<Notice>, AppError> {
    Ok(Json(
        state
            .board
            .mark_unsuccessful(id, payload.reason)
            .await?
            .into(),
    ))
}

async fn set_price(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DeliveryId>,
    Json(payload): Json<PriceRequest>,
) -> Result<Json<Notice>, AppError> {
    Ok(Json(state.board.set_price(id, payload.price).await?.into()))
}

async fn set_delivery_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DeliveryId>,
    Json(payload): Json<DeliveryTypeRequest>,
) -> Result<Json<Notice>, AppError> {
    Ok(Json(
        state
            .board
            .set_delivery_type(id, payload.delivery_type)
            .await?
            .into(),
    ))
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DeliveryId>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Notice>, AppError> {
    let driver_id = DriverId(payload.driver_id);
    Ok(Json(state.board.assign_driver(id, driver_id).await?.into()))
}

async fn notify_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DeliveryId>,
) -> Result<Json<Notice>, AppError> {
    Ok(Json(state.board.notify_driver(id).await?.into()))
}

async fn delete_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DeliveryId>,
    Query(confirmation): Query<Confirmation>,
) -> Result<Json<Notice>, AppError> {
    Ok(Json(
        state
            .board
            .delete_delivery(id, confirmation.confirm)
            .await?
            .into(),
    ))
}

async fn add_delivery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewDelivery>,
) -> Result<Json<Notice>, AppError> {
    Ok(Json(state.board.add_delivery(payload).await?.into()))
}
