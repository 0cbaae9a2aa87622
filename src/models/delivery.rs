use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::driver::DriverId;
use crate::models::wire;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeliveryId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for DeliveryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliverySource {
    Web,
    Bot,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Successful,
    Unsuccessful,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 3] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Successful,
        DeliveryStatus::Unsuccessful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Successful => "successful",
            DeliveryStatus::Unsuccessful => "unsuccessful",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    #[default]
    Payable,
    Free,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Payable => "payable",
            DeliveryType::Free => "free",
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payable" => Ok(DeliveryType::Payable),
            "free" => Ok(DeliveryType::Free),
            other => Err(format!("unknown delivery type: {other}, expected payable/free")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(rename = "_id")]
    pub id: DeliveryId,
    #[serde(default)]
    pub source: DeliverySource,
    #[serde(default, deserialize_with = "wire::lenient_text")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub pickup: String,
    #[serde(default)]
    pub dropoff: String,
    #[serde(default)]
    pub sender_phone: String,
    #[serde(default)]
    pub receiver_phone: String,
    #[serde(default, deserialize_with = "wire::lenient_text")]
    pub full_address: Option<String>,
    #[serde(default, alias = "Quantity", deserialize_with = "wire::lenient_text")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "wire::lenient_text")]
    pub item_description: Option<String>,
    pub status: DeliveryStatus,
    #[serde(default, deserialize_with = "wire::lenient_text")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub delivery_type: Option<DeliveryType>,
    #[serde(default, deserialize_with = "wire::lenient_price")]
    pub price: Option<u32>,
    #[serde(default, deserialize_with = "wire::blank_as_none")]
    pub driver_id: Option<DriverId>,
    #[serde(default)]
    pub notified: bool,
    #[serde(default, rename = "timestamp", deserialize_with = "wire::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The Add-Delivery form as submitted to `POST /api/add_delivery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDelivery {
    #[serde(default = "web_source")]
    pub source: DeliverySource,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub pickup: String,
    #[serde(default)]
    pub dropoff: String,
    #[serde(default)]
    pub sender_phone: String,
    #[serde(default)]
    pub receiver_phone: String,
    #[serde(default)]
    pub full_address: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub item_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(default)]
    pub delivery_type: DeliveryType,
}

fn web_source() -> DeliverySource {
    DeliverySource::Web
}

impl NewDelivery {
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            &self.pickup,
            &self.dropoff,
            &self.sender_phone,
            &self.receiver_phone,
        ];

        if required.iter().any(|value| value.trim().is_empty()) {
            return Err(AppError::ValidationFailure(
                "please fill in all required fields".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Delivery, DeliverySource, DeliveryStatus, DeliveryType, NewDelivery};
    use crate::models::driver::DriverId;

    #[test]
    fn decodes_backend_record_with_legacy_fields() {
        let delivery: Delivery = serde_json::from_value(json!({
            "_id": "66f1",
            "source": "telegram",
            "user_name": "Hana",
            "pickup": "Bole",
            "dropoff": "Piassa",
            "sender_phone": "0911",
            "receiver_phone": "0922",
            "Quantity": 2,
            "status": "pending",
            "price": "",
            "delivery_type": "",
            "driver_id": "",
            "timestamp": "Tue, 14 Oct 2025 10:00:00 GMT"
        }))
        .unwrap();

        assert_eq!(delivery.id.0, "66f1");
        assert_eq!(delivery.source, DeliverySource::Unknown);
        assert_eq!(delivery.quantity.as_deref(), Some("2"));
        assert_eq!(delivery.status, DeliveryStatus::Pending);
        assert_eq!(delivery.price, None);
        assert_eq!(delivery.delivery_type, None);
        assert_eq!(delivery.driver_id, None);
        assert!(!delivery.notified);
        assert!(delivery.created_at.is_some());
    }

    #[test]
    fn decodes_assigned_record() {
        let delivery: Delivery = serde_json::from_value(json!({
            "_id": "66f2",
            "source": "bot",
            "status": "unsuccessful",
            "reason": "receiver unreachable",
            "price": 200,
            "delivery_type": "free",
            "driver_id": "drv-1",
            "notified": true
        }))
        .unwrap();

        assert_eq!(delivery.source, DeliverySource::Bot);
        assert_eq!(delivery.reason.as_deref(), Some("receiver unreachable"));
        assert_eq!(delivery.price, Some(200));
        assert_eq!(delivery.delivery_type, Some(DeliveryType::Free));
        assert_eq!(delivery.driver_id, Some(DriverId::from("drv-1")));
        assert!(delivery.notified);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = serde_json::from_value::<Delivery>(json!({ "_id": "x", "status": "lost" }));
        assert!(result.is_err());
    }

    #[test]
    fn new_delivery_defaults_and_validation() {
        let form: NewDelivery = serde_json::from_value(json!({
            "pickup": "Bole",
            "dropoff": "",
            "sender_phone": "0911",
            "receiver_phone": "0922"
        }))
        .unwrap();

        assert_eq!(form.source, DeliverySource::Web);
        assert_eq!(form.delivery_type, DeliveryType::Payable);
        assert!(form.validate().is_err());
    }
}
