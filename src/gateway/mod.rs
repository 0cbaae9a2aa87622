//! Request/response shaping for the external delivery and driver backend.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryId, DeliveryStatus, DeliveryType, NewDelivery};
use crate::models::driver::{Driver, DriverFields, DriverId};

pub use self::http::HttpGateway;

/// Body of `POST /api/update_delivery_status/:id`. Absent fields are left
/// untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_type: Option<DeliveryType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate {
    Price(u32),
    DeliveryType(DeliveryType),
}

impl From<FieldUpdate> for DeliveryUpdate {
    fn from(field: FieldUpdate) -> Self {
        match field {
            FieldUpdate::Price(price) => DeliveryUpdate {
                price: Some(price),
                ..Default::default()
            },
            FieldUpdate::DeliveryType(delivery_type) => DeliveryUpdate {
                delivery_type: Some(delivery_type),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverAssignment {
    pub delivery_id: DeliveryId,
    pub driver_id: DriverId,
    pub price: u32,
    pub delivery_type: DeliveryType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub delivery_id: DeliveryId,
}

/// `{success, error?}` envelope returned by the side-effecting endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OpResult {
    pub fn into_result(self, operation: &str) -> Result<(), AppError> {
        if self.success {
            Ok(())
        } else {
            Err(AppError::BusinessRuleViolation(format!(
                "{operation} rejected: {}",
                self.error.unwrap_or_else(|| "no reason given".to_string())
            )))
        }
    }
}

#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    async fn list_deliveries(&self) -> Result<Vec<Delivery>, AppError>;

    async fn list_drivers(&self) -> Result<Vec<Driver>, AppError>;

    async fn update_delivery_status(
        &self,
        id: &DeliveryId,
        status: DeliveryStatus,
        reason: Option<&str>,
    ) -> Result<(), AppError>;

    async fn update_delivery_field(&self, id: &DeliveryId, field: FieldUpdate)
    -> Result<(), AppError>;

    async fn assign_driver(&self, assignment: &DriverAssignment) -> Result<(), AppError>;

    /// Not idempotent: every successful call messages the driver and customers.
    async fn notify_driver(&self, id: &DeliveryId) -> Result<(), AppError>;

    async fn delete_delivery(&self, id: &DeliveryId) -> Result<(), AppError>;

    async fn add_delivery(&self, form: &NewDelivery) -> Result<(), AppError>;

    async fn create_driver(&self, fields: &DriverFields) -> Result<Driver, AppError>;

    async fn update_driver(&self, driver: &Driver) -> Result<Driver, AppError>;

    async fn delete_driver(&self, id: &DriverId) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DeliveryUpdate, FieldUpdate, OpResult};
    use crate::error::AppError;
    use crate::models::delivery::{DeliveryStatus, DeliveryType};

    #[test]
    fn field_updates_serialize_a_single_key() {
        let body = serde_json::to_value(DeliveryUpdate::from(FieldUpdate::Price(200))).unwrap();
        assert_eq!(body, json!({ "price": 200 }));

        let body = serde_json::to_value(DeliveryUpdate::from(FieldUpdate::DeliveryType(
            DeliveryType::Free,
        )))
        .unwrap();
        assert_eq!(body, json!({ "delivery_type": "free" }));
    }

    #[test]
    fn status_update_carries_reason() {
        let update = DeliveryUpdate {
            status: Some(DeliveryStatus::Unsuccessful),
            reason: Some("closed".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            json!({ "status": "unsuccessful", "reason": "closed" })
        );
    }

    #[test]
    fn failed_op_result_is_a_business_rule_violation() {
        let result: OpResult =
            serde_json::from_value(json!({ "success": false, "error": "no price" })).unwrap();
        match result.into_result("assign driver") {
            Err(AppError::BusinessRuleViolation(msg)) => assert!(msg.contains("no price")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
