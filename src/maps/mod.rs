//! Mapping-provider client used by the price estimator.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::AppError;
use crate::observability::metrics::Metrics;

const AUTOCOMPLETE_LIMIT: &str = "5";
const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn validate(&self) -> Result<(), AppError> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);
        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(AppError::ValidationFailure(format!(
                "invalid coordinate {},{}",
                self.lat, self.lng
            )))
        }
    }

    fn as_query(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub place_id: Option<String>,
    pub description: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[async_trait]
pub trait MapProvider: Send + Sync {
    async fn autocomplete(&self, query: &str) -> Result<Vec<Place>, AppError>;

    /// Driving distance in metres.
    async fn route_distance(&self, origin: GeoPoint, destination: GeoPoint)
    -> Result<f64, AppError>;
}

#[derive(Clone)]
pub struct GebetaClient {
    http: Client,
    base_url: Url,
    api_key: String,
    metrics: Metrics,
}

impl fmt::Debug for GebetaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GebetaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    predictions: Vec<Value>,
}

impl GebetaClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        timeout: Duration,
        metrics: Metrics,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::Internal(format!("invalid map api url {base_url}: {err}")))?;
        let http = Client::builder()
            .user_agent("dispatch-console/0.1")
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            api_key,
            metrics,
        })
    }

    async fn get_json(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, AppError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| AppError::Internal(format!("invalid map api path {path}: {err}")))?;

        let start = Instant::now();
        let result = async {
            let response = self
                .http
                .get(url)
                .query(query)
                .query(&[("apiKey", self.api_key.as_str())])
                .send()
                .await
                .map_err(|err| AppError::NetworkFailure(format!("{operation} failed: {err}")))?;
            let status = response.status();
            if !status.is_success() {
                return Err(AppError::NetworkFailure(format!(
                    "{operation} failed: map provider returned {status}"
                )));
            }

            response.json::<Value>().await.map_err(|err| {
                AppError::NetworkFailure(format!("{operation}: invalid response: {err}"))
            })
        }
        .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        self.metrics
            .observe_gateway_call(operation, outcome, start.elapsed());
        result
    }
}

#[async_trait]
impl MapProvider for GebetaClient {
    async fn autocomplete(&self, query: &str) -> Result<Vec<Place>, AppError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let body = self
            .get_json(
                "map_autocomplete",
                "api/place/autocomplete/",
                &[("text", query), ("limit", AUTOCOMPLETE_LIMIT)],
            )
            .await?;

        let response: AutocompleteResponse = serde_json::from_value(body).map_err(|err| {
            AppError::NetworkFailure(format!("map_autocomplete: invalid response: {err}"))
        })?;

        Ok(response.predictions.iter().map(place_from_prediction).collect())
    }

    async fn route_distance(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<f64, AppError> {
        origin.validate()?;
        destination.validate()?;

        let origin = origin.as_query();
        let destination = destination.as_query();
        let body = self
            .get_json(
                "map_directions",
                "api/route/direction/",
                &[("origin", origin.as_str()), ("destination", destination.as_str())],
            )
            .await?;

        distance_from_directions(&body).ok_or_else(|| {
            warn!("directions response carried no distance");
            AppError::NetworkFailure("failed to calculate distance".to_string())
        })
    }
}

fn place_from_prediction(prediction: &Value) -> Place {
    Place {
        place_id: prediction.get("place_id").and_then(text_of),
        description: prediction
            .get("description")
            .and_then(text_of)
            .unwrap_or_default(),
        lat: coordinate(prediction, &["lat", "latitude"]),
        lon: coordinate(prediction, &["lon", "longitude"]),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn coordinate(prediction: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| prediction.get(*key))
        .find_map(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|coordinate| coordinate.is_finite())
}

fn distance_from_directions(body: &Value) -> Option<f64> {
    let direct = body.get("distance").and_then(Value::as_f64);
    let routed = || {
        body.get("routes")
            .and_then(|routes| routes.get(0))
            .and_then(|route| route.get("distance"))
            .and_then(Value::as_f64)
    };

    direct
        .filter(|distance| *distance > 0.0)
        .or_else(|| routed().filter(|distance| *distance > 0.0))
}
