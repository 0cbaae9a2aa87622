use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::AppError;
use crate::gateway::{
    DeliveryGateway, DeliveryUpdate, DriverAssignment, FieldUpdate, NotifyRequest, OpResult,
};
use crate::models::delivery::{Delivery, DeliveryId, DeliveryStatus, NewDelivery};
use crate::models::driver::{Driver, DriverFields, DriverId};
use crate::observability::metrics::Metrics;

#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: Url,
    metrics: Metrics,
}

impl fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration, metrics: Metrics) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| AppError::Internal(format!("invalid backend url {base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Internal(format!(
                "backend url {base_url} cannot carry a path"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .user_agent("dispatch-console/0.1")
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            metrics,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("backend url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Times a backend call and records its outcome once the response has
    /// been fully interpreted, so a 2xx carrying a rejection counts as an error.
    async fn observed<T, F>(&self, operation: &'static str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let start = Instant::now();
        let result = call.await;
        let outcome = if result.is_ok() { "success" } else { "error" };
        self.metrics
            .observe_gateway_call(operation, outcome, start.elapsed());
        result
    }

    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, AppError> {
        let response = request
            .send()
            .await
            .map_err(|err| AppError::NetworkFailure(format!("{operation} failed: {err}")))?;
        debug!(operation, status = %response.status(), "backend responded");
        Ok(response)
    }

    async fn checked(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, AppError> {
        let response = self.execute(operation, request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::NetworkFailure(format!(
                "{operation} failed: backend returned {status}"
            )));
        }
        Ok(response)
    }

    async fn expect_success(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<(), AppError> {
        self.observed(operation, async {
            self.checked(operation, request).await.map(drop)
        })
        .await
    }

    async fn expect_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, AppError> {
        self.observed(operation, async {
            self.checked(operation, request)
                .await?
                .json::<T>()
                .await
                .map_err(|err| {
                    AppError::NetworkFailure(format!("{operation}: invalid response: {err}"))
                })
        })
        .await
    }

    /// The `{success, error?}` endpoints report rejections in the body, even
    /// alongside an error status, so the body is read before the status.
    async fn expect_op_result(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<(), AppError> {
        self.observed(operation, async {
            let response = self.execute(operation, request).await?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|err| AppError::NetworkFailure(format!("{operation} failed: {err}")))?;

            match serde_json::from_slice::<OpResult>(&body) {
                Ok(result) => result.into_result(operation),
                Err(_) if !status.is_success() => Err(AppError::NetworkFailure(format!(
                    "{operation} failed: backend returned {status}"
                ))),
                Err(err) => Err(AppError::NetworkFailure(format!(
                    "{operation}: invalid response: {err}"
                ))),
            }
        })
        .await
    }
}

#[async_trait]
impl DeliveryGateway for HttpGateway {
    async fn list_deliveries(&self) -> Result<Vec<Delivery>, AppError> {
        let url = self.endpoint(&["api", "deliveries"])?;
        let records: Vec<Value> = self
            .expect_json("list_deliveries", self.http.get(url))
            .await?;

        let deliveries = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Delivery>(record) {
                Ok(delivery) => Some(delivery),
                Err(err) => {
                    warn!(error = %err, "skipping malformed delivery record");
                    None
                }
            })
            .collect();

        Ok(deliveries)
    }

    async fn list_drivers(&self) -> Result<Vec<Driver>, AppError> {
        let url = self.endpoint(&["api", "drivers"])?;
        self.expect_json("list_drivers", self.http.get(url)).await
    }

    async fn update_delivery_status(
        &self,
        id: &DeliveryId,
        status: DeliveryStatus,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        let url = self.endpoint(&["api", "update_delivery_status", &id.0])?;
        let body = DeliveryUpdate {
            status: Some(status),
            reason: reason.map(str::to_string),
            ..Default::default()
        };
        self.expect_success("update_delivery_status", self.http.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn update_delivery_field(
        &self,
        id: &DeliveryId,
        field: FieldUpdate,
    ) -> Result<(), AppError> {
        let url = self.endpoint(&["api", "update_delivery_status", &id.0])?;
        let body = DeliveryUpdate::from(field);
        self.expect_success("update_delivery_field", self.http.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn assign_driver(&self, assignment: &DriverAssignment) -> Result<(), AppError> {
        let url = self.endpoint(&["api", "assign_driver"])?;
        self.expect_op_result("assign_driver", self.http.post(url).json(assignment))
            .await
    }

    async fn notify_driver(&self, id: &DeliveryId) -> Result<(), AppError> {
        let url = self.endpoint(&["api", "notify_driver"])?;
        let body = NotifyRequest {
            delivery_id: id.clone(),
        };
        self.expect_op_result("notify_driver", self.http.post(url).json(&body))
            .await
    }

    async fn delete_delivery(&self, id: &DeliveryId) -> Result<(), AppError> {
        let url = self.endpoint(&["api", "delete_delivery", &id.0])?;
        self.expect_success("delete_delivery", self.http.delete(url))
            .await?;
        Ok(())
    }

    async fn add_delivery(&self, form: &NewDelivery) -> Result<(), AppError> {
        let url = self.endpoint(&["api", "add_delivery"])?;
        self.expect_op_result("add_delivery", self.http.post(url).json(form))
            .await
    }

    async fn create_driver(&self, fields: &DriverFields) -> Result<Driver, AppError> {
        let url = self.endpoint(&["api", "drivers"])?;
        self.expect_json("create_driver", self.http.post(url).json(fields))
            .await
    }

    async fn update_driver(&self, driver: &Driver) -> Result<Driver, AppError> {
        let url = self.endpoint(&["api", "drivers", &driver.id.0])?;
        self.expect_json("update_driver", self.http.put(url).json(driver))
            .await
    }

    async fn delete_driver(&self, id: &DriverId) -> Result<(), AppError> {
        let url = self.endpoint(&["api", "drivers", &id.0])?;
        self.expect_success("delete_driver", self.http.delete(url))
            .await?;
        Ok(())
    }
}
