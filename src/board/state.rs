use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::board::{
    DEFAULT_ALERT_DURATION, DEFAULT_PAGE_SIZE, NewDeliveryDetection, StatusCounts,
};
use crate::error::AppError;
use crate::gateway::{DriverAssignment, FieldUpdate};
use crate::models::delivery::{Delivery, DeliveryId, DeliveryStatus, DeliveryType};
use crate::models::driver::{Driver, DriverId};

#[derive(Debug, Clone)]
pub struct BoardSettings {
    pub page_size: usize,
    pub alert_duration: Duration,
    pub detection: NewDeliveryDetection,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            alert_duration: DEFAULT_ALERT_DURATION,
            detection: NewDeliveryDetection::default(),
        }
    }
}

/// Everything a user or the poller can do to the board.
#[derive(Debug, Clone)]
pub enum Action {
    Mount,
    Unmount,
    DriversLoaded(Vec<Driver>),
    Refreshed {
        epoch: u64,
        deliveries: Vec<Delivery>,
        at: Instant,
    },
    RefreshFailed {
        epoch: u64,
        message: String,
    },
    ExpireAlert {
        at: Instant,
    },
    SetFilter(DeliveryStatus),
    SetPage(usize),
    MarkSuccessful(DeliveryId),
    MarkUnsuccessful {
        id: DeliveryId,
        reason: String,
    },
    SetPrice {
        id: DeliveryId,
        price: u32,
    },
    SetDeliveryType {
        id: DeliveryId,
        delivery_type: DeliveryType,
    },
    AssignDriver {
        id: DeliveryId,
        driver_id: DriverId,
    },
    NotifyDriver(DeliveryId),
    Delete {
        id: DeliveryId,
        confirmed: bool,
    },
    Settled {
        seq: u64,
        outcome: Result<(), String>,
    },
}

/// A backend call the board wants made. `seq` ties the eventual outcome back
/// to the pending-write log through [`Action::Settled`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UpdateStatus {
        seq: u64,
        id: DeliveryId,
        status: DeliveryStatus,
        reason: Option<String>,
    },
    UpdateField {
        seq: u64,
        id: DeliveryId,
        field: FieldUpdate,
    },
    AssignDriver {
        seq: u64,
        assignment: DriverAssignment,
    },
    NotifyDriver {
        seq: u64,
        id: DeliveryId,
    },
    DeleteDelivery {
        seq: u64,
        id: DeliveryId,
    },
}

impl Command {
    pub fn seq(&self) -> u64 {
        match self {
            Command::UpdateStatus { seq, .. }
            | Command::UpdateField { seq, .. }
            | Command::AssignDriver { seq, .. }
            | Command::NotifyDriver { seq, .. }
            | Command::DeleteDelivery { seq, .. } => *seq,
        }
    }

    pub fn delivery_id(&self) -> &DeliveryId {
        match self {
            Command::UpdateStatus { id, .. }
            | Command::UpdateField { id, .. }
            | Command::NotifyDriver { id, .. }
            | Command::DeleteDelivery { id, .. } => id,
            Command::AssignDriver { assignment, .. } => &assignment.delivery_id,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Command::UpdateStatus { .. } => "update_delivery_status",
            Command::UpdateField { .. } => "update_delivery_field",
            Command::AssignDriver { .. } => "assign_driver",
            Command::NotifyDriver { .. } => "notify_driver",
            Command::DeleteDelivery { .. } => "delete_delivery",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum WriteKind {
    /// Already applied locally; a failure is left for the next refresh to
    /// correct.
    Optimistic,
    /// Applied only once the backend confirms it.
    Assign(DriverAssignment),
    Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    InFlight,
    Failed,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    seq: u64,
    delivery_id: DeliveryId,
    kind: WriteKind,
    state: WriteState,
}

#[derive(Debug)]
pub struct DeliveryBoard {
    settings: BoardSettings,
    deliveries: Vec<Delivery>,
    drivers: Vec<Driver>,
    filter: DeliveryStatus,
    page: usize,
    counts: StatusCounts,
    alert_until: Option<Instant>,
    loaded: bool,
    mounted: bool,
    epoch: u64,
    pending: Vec<PendingWrite>,
    next_seq: u64,
    last_refresh_error: Option<String>,
}

impl Default for DeliveryBoard {
    fn default() -> Self {
        Self::new(BoardSettings::default())
    }
}

impl DeliveryBoard {
    pub fn new(settings: BoardSettings) -> Self {
        Self {
            settings,
            deliveries: Vec::new(),
            drivers: Vec::new(),
            filter: DeliveryStatus::Pending,
            page: 1,
            counts: StatusCounts::default(),
            alert_until: None,
            loaded: false,
            mounted: false,
            epoch: 0,
            pending: Vec::new(),
            next_seq: 1,
            last_refresh_error: None,
        }
    }

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    pub fn delivery(&self, id: &DeliveryId) -> Option<&Delivery> {
        self.deliveries.iter().find(|delivery| &delivery.id == id)
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn driver_name(&self, id: &DriverId) -> Option<&str> {
        self.drivers
            .iter()
            .find(|driver| &driver.id == id)
            .map(|driver| driver.name.as_str())
    }

    pub fn filter(&self) -> DeliveryStatus {
        self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn counts(&self) -> StatusCounts {
        self.counts
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn new_delivery_alert(&self) -> bool {
        self.alert_until.is_some()
    }

    pub fn alert_deadline(&self) -> Option<Instant> {
        self.alert_until
    }

    pub fn last_refresh_error(&self) -> Option<&str> {
        self.last_refresh_error.as_deref()
    }

    pub fn pending_writes(&self) -> usize {
        self.pending
            .iter()
            .filter(|write| write.state == WriteState::InFlight)
            .count()
    }

    /// Deliveries whose last optimistic write was rejected and has not been
    /// reconciled by a refresh yet.
    pub fn unsynced(&self) -> Vec<DeliveryId> {
        let mut seen = HashSet::new();
        self.pending
            .iter()
            .filter(|write| write.state == WriteState::Failed)
            .filter(|write| seen.insert(write.delivery_id.clone()))
            .map(|write| write.delivery_id.clone())
            .collect()
    }

    pub fn notify_in_flight(&self, id: &DeliveryId) -> bool {
        self.pending.iter().any(|write| {
            &write.delivery_id == id
                && write.kind == WriteKind::Notify
                && write.state == WriteState::InFlight
        })
    }

    pub fn filtered(&self) -> Vec<&Delivery> {
        self.deliveries
            .iter()
            .filter(|delivery| delivery.status == self.filter)
            .collect()
    }

    /// Zero when the filtered list is empty; displays clamp it to 1.
    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(self.settings.page_size)
    }

    pub fn current_page(&self) -> Vec<&Delivery> {
        let start = (self.page - 1) * self.settings.page_size;
        self.filtered()
            .into_iter()
            .skip(start)
            .take(self.settings.page_size)
            .collect()
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Option<Command>, AppError> {
        match action {
            Action::Mount => {
                self.epoch += 1;
                self.mounted = true;
                self.loaded = false;
                Ok(None)
            }
            Action::Unmount => {
                self.epoch += 1;
                self.mounted = false;
                self.pending.clear();
                self.alert_until = None;
                Ok(None)
            }
            Action::DriversLoaded(drivers) => {
                self.drivers = drivers;
                Ok(None)
            }
            Action::Refreshed {
                epoch,
                deliveries,
                at,
            } => {
                if self.accepts(epoch) {
                    self.apply_refresh(deliveries, at);
                }
                Ok(None)
            }
            Action::RefreshFailed { epoch, message } => {
                if self.accepts(epoch) {
                    self.last_refresh_error = Some(message);
                }
                Ok(None)
            }
            Action::ExpireAlert { at } => {
                if self.alert_until.is_some_and(|deadline| at >= deadline) {
                    self.alert_until = None;
                }
                Ok(None)
            }
            Action::SetFilter(status) => {
                self.filter = status;
                self.page = 1;
                Ok(None)
            }
            Action::SetPage(page) => {
                self.set_page(page)?;
                Ok(None)
            }
            Action::MarkSuccessful(id) => self.mark_successful(id).map(Some),
            Action::MarkUnsuccessful { id, reason } => {
                self.mark_unsuccessful(id, reason).map(Some)
            }
            Action::SetPrice { id, price } => self.set_price(id, price).map(Some),
            Action::SetDeliveryType { id, delivery_type } => {
                self.update_field(id, FieldUpdate::DeliveryType(delivery_type))
                    .map(Some)
            }
            Action::AssignDriver { id, driver_id } => self.assign_driver(id, driver_id).map(Some),
            Action::NotifyDriver(id) => self.notify_driver(id).map(Some),
            Action::Delete { id, confirmed } => self.delete(id, confirmed),
            Action::Settled { seq, outcome } => {
                self.settle(seq, outcome);
                Ok(None)
            }
        }
    }

    fn accepts(&self, epoch: u64) -> bool {
        self.mounted && epoch == self.epoch
    }

    fn apply_refresh(&mut self, deliveries: Vec<Delivery>, at: Instant) {
        if self.loaded && self.has_new_deliveries(&deliveries) {
            self.alert_until = Some(at + self.settings.alert_duration);
        }

        self.deliveries = deliveries;
        self.loaded = true;
        self.last_refresh_error = None;
        self.pending.retain(|write| write.state == WriteState::InFlight);
        self.deliveries_changed();
    }

    fn has_new_deliveries(&self, fresh: &[Delivery]) -> bool {
        match self.settings.detection {
            NewDeliveryDetection::NetGrowth => fresh.len() > self.deliveries.len(),
            NewDeliveryDetection::IdDiff => {
                let known: HashSet<&DeliveryId> =
                    self.deliveries.iter().map(|delivery| &delivery.id).collect();
                fresh.iter().any(|delivery| !known.contains(&delivery.id))
            }
        }
    }

    fn deliveries_changed(&mut self) {
        self.counts = StatusCounts::from_deliveries(&self.deliveries);
        if (self.page - 1) * self.settings.page_size >= self.filtered().len() {
            self.page = 1;
        }
    }

    fn set_page(&mut self, page: usize) -> Result<(), AppError> {
        let last = self.total_pages().max(1);
        if page == 0 || page > last {
            return Err(AppError::ValidationFailure(format!(
                "page {page} is out of range 1..={last}"
            )));
        }
        self.page = page;
        Ok(())
    }

    fn delivery_mut(&mut self, id: &DeliveryId) -> Result<&mut Delivery, AppError> {
        self.deliveries
            .iter_mut()
            .find(|delivery| &delivery.id == id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))
    }

    fn record(&mut self, delivery_id: DeliveryId, kind: WriteKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingWrite {
            seq,
            delivery_id,
            kind,
            state: WriteState::InFlight,
        });
        seq
    }

    fn mark_successful(&mut self, id: DeliveryId) -> Result<Command, AppError> {
        let delivery = self.delivery_mut(&id)?;
        if delivery.status == DeliveryStatus::Successful {
            return Err(AppError::BusinessRuleViolation(format!(
                "delivery {id} is already successful"
            )));
        }

        delivery.status = DeliveryStatus::Successful;
        delivery.reason = None;
        self.deliveries_changed();

        let seq = self.record(id.clone(), WriteKind::Optimistic);
        Ok(Command::UpdateStatus {
            seq,
            id,
            status: DeliveryStatus::Successful,
            reason: None,
        })
    }

    fn mark_unsuccessful(&mut self, id: DeliveryId, reason: String) -> Result<Command, AppError> {
        let delivery = self.delivery_mut(&id)?;
        if delivery.status == DeliveryStatus::Unsuccessful {
            return Err(AppError::BusinessRuleViolation(format!(
                "delivery {id} is already unsuccessful"
            )));
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::ValidationFailure("please enter a reason".to_string()));
        }

        delivery.status = DeliveryStatus::Unsuccessful;
        delivery.reason = Some(reason.to_string());
        self.deliveries_changed();

        let seq = self.record(id.clone(), WriteKind::Optimistic);
        Ok(Command::UpdateStatus {
            seq,
            id,
            status: DeliveryStatus::Unsuccessful,
            reason: Some(reason.to_string()),
        })
    }

    fn set_price(&mut self, id: DeliveryId, price: u32) -> Result<Command, AppError> {
        if price == 0 {
            return Err(AppError::ValidationFailure(
                "price must be greater than zero".to_string(),
            ));
        }
        self.update_field(id, FieldUpdate::Price(price))
    }

    fn update_field(&mut self, id: DeliveryId, field: FieldUpdate) -> Result<Command, AppError> {
        let delivery = self.delivery_mut(&id)?;
        match field {
            FieldUpdate::Price(price) => delivery.price = Some(price),
            FieldUpdate::DeliveryType(delivery_type) => {
                delivery.delivery_type = Some(delivery_type)
            }
        }

        let seq = self.record(id.clone(), WriteKind::Optimistic);
        Ok(Command::UpdateField { seq, id, field })
    }

    fn assign_driver(&mut self, id: DeliveryId, driver_id: DriverId) -> Result<Command, AppError> {
        if driver_id.0.trim().is_empty() {
            return Err(AppError::ValidationFailure(
                "please select a driver first".to_string(),
            ));
        }

        let delivery = self.delivery_mut(&id)?;
        let (Some(price), Some(delivery_type)) = (delivery.price, delivery.delivery_type) else {
            return Err(AppError::BusinessRuleViolation(
                "set price and delivery type first".to_string(),
            ));
        };

        let assignment = DriverAssignment {
            delivery_id: id.clone(),
            driver_id,
            price,
            delivery_type,
        };
        let seq = self.record(id, WriteKind::Assign(assignment.clone()));
        Ok(Command::AssignDriver { seq, assignment })
    }

    fn notify_driver(&mut self, id: DeliveryId) -> Result<Command, AppError> {
        let in_flight = self.notify_in_flight(&id);
        let delivery = self.delivery_mut(&id)?;

        if delivery.driver_id.is_none() {
            return Err(AppError::BusinessRuleViolation(
                "assign a driver before notifying".to_string(),
            ));
        }
        if delivery.notified {
            return Err(AppError::BusinessRuleViolation(
                "driver already notified".to_string(),
            ));
        }
        if in_flight {
            return Err(AppError::BusinessRuleViolation(
                "notification already in progress".to_string(),
            ));
        }

        let seq = self.record(id.clone(), WriteKind::Notify);
        Ok(Command::NotifyDriver { seq, id })
    }

    fn delete(&mut self, id: DeliveryId, confirmed: bool) -> Result<Option<Command>, AppError> {
        if !confirmed {
            return Ok(None);
        }

        let before = self.deliveries.len();
        self.deliveries.retain(|delivery| delivery.id != id);
        if self.deliveries.len() == before {
            return Err(AppError::NotFound(format!("delivery {id} not found")));
        }
        self.deliveries_changed();

        let seq = self.record(id.clone(), WriteKind::Optimistic);
        Ok(Some(Command::DeleteDelivery { seq, id }))
    }

    fn settle(&mut self, seq: u64, outcome: Result<(), String>) {
        let Some(index) = self.pending.iter().position(|write| write.seq == seq) else {
            return;
        };

        let kind = self.pending[index].kind.clone();
        match (outcome, kind) {
            (Ok(()), WriteKind::Optimistic) => {
                self.pending.remove(index);
            }
            (Ok(()), WriteKind::Assign(assignment)) => {
                self.pending.remove(index);
                if let Ok(delivery) = self.delivery_mut(&assignment.delivery_id) {
                    delivery.driver_id = Some(assignment.driver_id);
                    delivery.price = Some(assignment.price);
                    delivery.delivery_type = Some(assignment.delivery_type);
                }
            }
            (Ok(()), WriteKind::Notify) => {
                let write = self.pending.remove(index);
                if let Ok(delivery) = self.delivery_mut(&write.delivery_id) {
                    delivery.notified = true;
                }
            }
            (Err(_), WriteKind::Optimistic) => {
                self.pending[index].state = WriteState::Failed;
            }
            (Err(_), WriteKind::Assign(_) | WriteKind::Notify) => {
                self.pending.remove(index);
            }
        }
    }
}
