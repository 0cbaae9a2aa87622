use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub String);

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DriverId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for DriverId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    #[serde(rename = "_id")]
    pub id: DriverId,
    pub name: String,
    pub phone: String,
    pub vehicle_plate: String,
}

/// Editable driver fields, as collected by the roster editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverFields {
    pub name: String,
    pub phone: String,
    pub vehicle_plate: String,
}

impl DriverFields {
    pub fn validate(&self) -> Result<(), AppError> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("vehicle_plate", &self.vehicle_plate),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailure(format!(
                "please fill all fields (missing: {})",
                missing.join(", ")
            )))
        }
    }

    pub fn with_id(self, id: DriverId) -> Driver {
        Driver {
            id,
            name: self.name,
            phone: self.phone,
            vehicle_plate: self.vehicle_plate,
        }
    }
}
