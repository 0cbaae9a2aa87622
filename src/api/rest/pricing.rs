use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;
use crate::maps::{GeoPoint, Place};
use crate::pricing::{PriceTier, Quote};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/price", get(price_for_distance))
        .route("/price/tiers", get(price_tiers))
        .route("/price/estimate", post(estimate_price))
        .route("/places", get(search_places))
}

#[derive(Deserialize)]
pub struct DistanceQuery {
    pub distance_km: f64,
}

#[derive(Deserialize)]
pub struct EstimateRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

#[derive(Deserialize)]
pub struct PlacesQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct TierTable {
    pub tiers: Vec<PriceTier>,
    pub top_tier: u32,
}

async fn price_for_distance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DistanceQuery>,
) -> Result<Json<Quote>, AppError> {
    let price = state.prices.resolve_price(query.distance_km)?;
    Ok(Json(Quote {
        distance_km: query.distance_km,
        price,
    }))
}

async fn price_tiers(State(state): State<Arc<AppState>>) -> Json<TierTable> {
    Json(TierTable {
        tiers: state.prices.tiers().to_vec(),
        top_tier: state.prices.top_tier(),
    })
}

async fn estimate_price(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EstimateRequest>,
) -> Result<Json<Quote>, AppError> {
    let distance_m = state
        .maps
        .route_distance(payload.origin, payload.destination)
        .await
        .inspect_err(|err| warn!(error = %err, "price estimate failed"))?;

    Ok(Json(state.prices.quote_for_meters(distance_m)?))
}

async fn search_places(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlacesQuery>,
) -> Result<Json<Vec<Place>>, AppError> {
    Ok(Json(state.maps.autocomplete(&query.q).await?))
}
