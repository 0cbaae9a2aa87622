use serde::Serialize;

use crate::board::StatusCounts;
use crate::board::state::DeliveryBoard;
use crate::models::delivery::{Delivery, DeliveryId, DeliveryStatus};
use crate::models::driver::Driver;

/// Which row actions are currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowActions {
    pub mark_successful: bool,
    pub mark_unsuccessful: bool,
    pub assign_driver: bool,
    pub notify_driver: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRow {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub driver_name: Option<String>,
    pub actions: RowActions,
}

/// What the browser renders: one page of the filtered board plus the tab
/// counts and banner state.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub filter: DeliveryStatus,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub counts: StatusCounts,
    pub new_delivery_alert: bool,
    pub items: Vec<DeliveryRow>,
    pub drivers: Vec<Driver>,
    pub pending_writes: usize,
    pub unsynced: Vec<DeliveryId>,
    pub last_refresh_error: Option<String>,
}

impl DeliveryBoard {
    pub fn row_actions(&self, delivery: &Delivery) -> RowActions {
        RowActions {
            mark_successful: delivery.status != DeliveryStatus::Successful,
            mark_unsuccessful: delivery.status != DeliveryStatus::Unsuccessful,
            assign_driver: delivery.price.is_some() && delivery.delivery_type.is_some(),
            notify_driver: delivery.driver_id.is_some()
                && !delivery.notified
                && !self.notify_in_flight(&delivery.id),
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let items = self
            .current_page()
            .into_iter()
            .map(|delivery| DeliveryRow {
                driver_name: delivery
                    .driver_id
                    .as_ref()
                    .and_then(|id| self.driver_name(id))
                    .map(str::to_string),
                actions: self.row_actions(delivery),
                delivery: delivery.clone(),
            })
            .collect();

        BoardSnapshot {
            filter: self.filter(),
            page: self.page(),
            total_pages: self.total_pages().max(1),
            page_size: self.settings().page_size,
            counts: self.counts(),
            new_delivery_alert: self.new_delivery_alert(),
            items,
            drivers: self.drivers().to_vec(),
            pending_writes: self.pending_writes(),
            unsynced: self.unsynced(),
            last_refresh_error: self.last_refresh_error().map(str::to_string),
        }
    }
}
