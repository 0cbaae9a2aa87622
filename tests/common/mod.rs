#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dispatch_console::board::BoardSettings;
use dispatch_console::error::AppError;
use dispatch_console::gateway::{DeliveryGateway, DriverAssignment, FieldUpdate};
use dispatch_console::maps::{GeoPoint, MapProvider, Place};
use dispatch_console::models::delivery::{
    Delivery, DeliveryId, DeliverySource, DeliveryStatus, NewDelivery,
};
use dispatch_console::models::driver::{Driver, DriverFields, DriverId};
use dispatch_console::observability::metrics::Metrics;
use dispatch_console::pricing::PriceTable;
use dispatch_console::state::AppState;
use tokio::sync::RwLock;

/// In-memory stand-in for the delivery backend.
#[derive(Default)]
pub struct FakeBackend {
    pub deliveries: DashMap<DeliveryId, Delivery>,
    pub drivers: DashMap<DriverId, Driver>,
    /// Operation name to error message; matching calls fail.
    failing: DashMap<&'static str, String>,
    calls: DashMap<&'static str, usize>,
    next_id: AtomicUsize,
    /// List and notify calls wait while a writer holds this.
    pub gate: RwLock<()>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_pending(count: usize) -> Arc<Self> {
        let backend = Self::new();
        for i in 0..count {
            backend.insert(delivery(&format!("d{i:02}"), DeliveryStatus::Pending));
        }
        backend
    }

    pub fn insert(&self, delivery: Delivery) {
        self.deliveries.insert(delivery.id.clone(), delivery);
    }

    pub fn add_driver(&self, id: &str, name: &str) -> Driver {
        let driver = Driver {
            id: DriverId::from(id),
            name: name.to_string(),
            phone: "0911000000".to_string(),
            vehicle_plate: "AA-3-12345".to_string(),
        };
        self.drivers.insert(driver.id.clone(), driver.clone());
        driver
    }

    pub fn fail(&self, operation: &'static str, message: &str) {
        self.failing.insert(operation, message.to_string());
    }

    pub fn heal(&self, operation: &'static str) {
        self.failing.remove(operation);
    }

    pub fn calls(&self, operation: &'static str) -> usize {
        self.calls.get(operation).map_or(0, |count| *count)
    }

    pub fn stored(&self, id: &str) -> Option<Delivery> {
        self.deliveries
            .get(&DeliveryId::from(id))
            .map(|entry| entry.value().clone())
    }

    fn enter(&self, operation: &'static str) -> Result<(), AppError> {
        *self.calls.entry(operation).or_insert(0) += 1;
        match self.failing.get(operation) {
            Some(message) => Err(AppError::NetworkFailure(message.clone())),
            None => Ok(()),
        }
    }

    fn with_delivery<F>(&self, id: &DeliveryId, update: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Delivery),
    {
        let mut entry = self
            .deliveries
            .get_mut(id)
            .ok_or_else(|| AppError::BusinessRuleViolation(format!("no delivery {id}")))?;
        update(entry.value_mut());
        Ok(())
    }
}

#[async_trait]
impl DeliveryGateway for FakeBackend {
    async fn list_deliveries(&self) -> Result<Vec<Delivery>, AppError> {
        let _open = self.gate.read().await;
        self.enter("list_deliveries")?;
        let mut deliveries: Vec<Delivery> = self
            .deliveries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        deliveries.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(deliveries)
    }

    async fn list_drivers(&self) -> Result<Vec<Driver>, AppError> {
        self.enter("list_drivers")?;
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(drivers)
    }

    async fn update_delivery_status(
        &self,
        id: &DeliveryId,
        status: DeliveryStatus,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        self.enter("update_delivery_status")?;
        self.with_delivery(id, |delivery| {
            delivery.status = status;
            delivery.reason = reason.map(str::to_string);
        })
    }

    async fn update_delivery_field(
        &self,
        id: &DeliveryId,
        field: FieldUpdate,
    ) -> Result<(), AppError> {
        self.enter("update_delivery_field")?;
        self.with_delivery(id, |delivery| match field {
            FieldUpdate::Price(price) => delivery.price = Some(price),
            FieldUpdate::DeliveryType(kind) => delivery.delivery_type = Some(kind),
        })
    }

    async fn assign_driver(&self, assignment: &DriverAssignment) -> Result<(), AppError> {
        self.enter("assign_driver")?;
        self.with_delivery(&assignment.delivery_id, |delivery| {
            delivery.driver_id = Some(assignment.driver_id.clone());
            delivery.price = Some(assignment.price);
            delivery.delivery_type = Some(assignment.delivery_type);
        })
    }

    async fn notify_driver(&self, id: &DeliveryId) -> Result<(), AppError> {
        let _open = self.gate.read().await;
        self.enter("notify_driver")?;
        self.with_delivery(id, |delivery| delivery.notified = true)
    }

    async fn delete_delivery(&self, id: &DeliveryId) -> Result<(), AppError> {
        self.enter("delete_delivery")?;
        self.deliveries.remove(id);
        Ok(())
    }

    async fn add_delivery(&self, form: &NewDelivery) -> Result<(), AppError> {
        self.enter("add_delivery")?;
        let id = format!("new{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut created = delivery(&id, DeliveryStatus::Pending);
        created.source = form.source;
        created.pickup = form.pickup.clone();
        created.dropoff = form.dropoff.clone();
        created.sender_phone = form.sender_phone.clone();
        created.receiver_phone = form.receiver_phone.clone();
        created.price = form.price;
        created.delivery_type = Some(form.delivery_type);
        self.insert(created);
        Ok(())
    }

    async fn create_driver(&self, fields: &DriverFields) -> Result<Driver, AppError> {
        self.enter("create_driver")?;
        let id = format!("drv{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let driver = fields.clone().with_id(DriverId(id));
        self.drivers.insert(driver.id.clone(), driver.clone());
        Ok(driver)
    }

    async fn update_driver(&self, driver: &Driver) -> Result<Driver, AppError> {
        self.enter("update_driver")?;
        self.drivers.insert(driver.id.clone(), driver.clone());
        Ok(driver.clone())
    }

    async fn delete_driver(&self, id: &DriverId) -> Result<(), AppError> {
        self.enter("delete_driver")?;
        self.drivers.remove(id);
        Ok(())
    }
}

/// Map provider with a fixed route length.
pub struct FakeMaps {
    pub distance_m: f64,
}

#[async_trait]
impl MapProvider for FakeMaps {
    async fn autocomplete(&self, query: &str) -> Result<Vec<Place>, AppError> {
        if query.trim().chars().count() < 2 {
            return Ok(Vec::new());
        }
        Ok(vec![Place {
            place_id: Some("p1".to_string()),
            description: format!("{query}, Addis Ababa"),
            lat: Some(9.01),
            lon: Some(38.76),
        }])
    }

    async fn route_distance(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<f64, AppError> {
        origin.validate()?;
        destination.validate()?;
        Ok(self.distance_m)
    }
}

pub fn delivery(id: &str, status: DeliveryStatus) -> Delivery {
    Delivery {
        id: DeliveryId::from(id),
        source: DeliverySource::Bot,
        user_name: Some("Selam".to_string()),
        pickup: "Bole".to_string(),
        dropoff: "Merkato".to_string(),
        sender_phone: "0911111111".to_string(),
        receiver_phone: "0922222222".to_string(),
        full_address: None,
        quantity: Some("1".to_string()),
        item_description: None,
        status,
        reason: None,
        delivery_type: None,
        price: None,
        driver_id: None,
        notified: false,
        created_at: None,
    }
}

pub fn app_state(backend: Arc<FakeBackend>, poll_interval: Duration) -> Arc<AppState> {
    Arc::new(AppState::new(
        backend,
        Arc::new(FakeMaps { distance_m: 7_340.0 }),
        PriceTable::default(),
        BoardSettings::default(),
        poll_interval,
        64,
        Metrics::new(),
    )
    .unwrap())
}
