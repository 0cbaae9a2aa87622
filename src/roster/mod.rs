//! Driver roster: CRUD over the drivers eligible for assignment.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::gateway::DeliveryGateway;
use crate::models::driver::{Driver, DriverFields, DriverId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    drivers: Vec<Driver>,
    loaded: bool,
}

impl Roster {
    pub fn new(drivers: Vec<Driver>) -> Self {
        Self {
            drivers,
            loaded: true,
        }
    }

    /// False until a full list has been fetched; until then the roster only
    /// holds drivers touched in this session.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn get(&self, id: &DriverId) -> Option<&Driver> {
        self.drivers.iter().find(|driver| &driver.id == id)
    }

    pub fn append(&mut self, driver: Driver) {
        self.drivers.push(driver);
    }

    /// Replaces the driver with the same id in place. Returns false when the
    /// id is not on the roster.
    pub fn replace(&mut self, driver: Driver) -> bool {
        match self.drivers.iter_mut().find(|existing| existing.id == driver.id) {
            Some(existing) => {
                *existing = driver;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &DriverId) -> bool {
        let before = self.drivers.len();
        self.drivers.retain(|driver| &driver.id != id);
        self.drivers.len() != before
    }
}

pub struct RosterManager {
    roster: RwLock<Roster>,
    gateway: Arc<dyn DeliveryGateway>,
}

impl RosterManager {
    pub fn new(gateway: Arc<dyn DeliveryGateway>) -> Self {
        Self {
            roster: RwLock::new(Roster::default()),
            gateway,
        }
    }

    pub async fn drivers(&self) -> Vec<Driver> {
        self.roster.read().await.drivers().to_vec()
    }

    /// The full roster, or `None` if it was never fetched.
    pub async fn loaded_drivers(&self) -> Option<Vec<Driver>> {
        let roster = self.roster.read().await;
        roster.is_loaded().then(|| roster.drivers().to_vec())
    }

    pub async fn load(&self) -> Result<Vec<Driver>, AppError> {
        let drivers = self.gateway.list_drivers().await.inspect_err(|err| {
            warn!(error = %err, "failed to fetch drivers");
        })?;

        *self.roster.write().await = Roster::new(drivers.clone());
        Ok(drivers)
    }

    pub async fn add(&self, fields: DriverFields) -> Result<Driver, AppError> {
        fields.validate()?;

        let created = self.gateway.create_driver(&fields).await.inspect_err(|err| {
            error!(error = %err, "failed to save driver");
        })?;

        self.roster.write().await.append(created.clone());
        info!(driver_id = %created.id, "driver added");
        Ok(created)
    }

    pub async fn edit(&self, id: DriverId, fields: DriverFields) -> Result<Driver, AppError> {
        fields.validate()?;

        let updated = self
            .gateway
            .update_driver(&fields.with_id(id.clone()))
            .await
            .inspect_err(|err| {
                error!(driver_id = %id, error = %err, "failed to save driver");
            })?;

        let mut roster = self.roster.write().await;
        if !roster.replace(updated.clone()) {
            roster.append(updated.clone());
        }
        info!(driver_id = %updated.id, "driver updated");
        Ok(updated)
    }

    /// Removes the driver locally once confirmed, whatever the backend says.
    /// Returns whether anything was attempted.
    pub async fn delete(&self, id: DriverId, confirmed: bool) -> Result<bool, AppError> {
        if !confirmed {
            return Ok(false);
        }

        let result = self.gateway.delete_driver(&id).await;
        self.roster.write().await.remove(&id);

        match result {
            Ok(()) => {
                info!(driver_id = %id, "driver deleted");
                Ok(true)
            }
            Err(err) => {
                error!(driver_id = %id, error = %err, "failed to delete driver");
                Err(err)
            }
        }
    }
}
