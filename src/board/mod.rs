//! The Delivery Board: full delivery list, filtered/paged views, optimistic
//! mutations and poll-driven reconciliation with the backend.

pub mod controller;
pub mod state;
pub mod view;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::models::delivery::{Delivery, DeliveryStatus};

pub use self::controller::BoardController;
pub use self::state::{Action, BoardSettings, Command, DeliveryBoard};
pub use self::view::BoardSnapshot;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_ALERT_DURATION: Duration = Duration::from_secs(5);

/// How a refresh decides that new deliveries arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NewDeliveryDetection {
    /// Some id in the fresh list was not on the board before. Catches a
    /// delete-plus-create between two polls.
    #[default]
    IdDiff,
    /// The fresh list is strictly longer than the previous one.
    NetGrowth,
}

impl FromStr for NewDeliveryDetection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id_diff" => Ok(NewDeliveryDetection::IdDiff),
            "net_growth" => Ok(NewDeliveryDetection::NetGrowth),
            other => Err(format!(
                "unknown detection mode: {other}, expected id_diff/net_growth"
            )),
        }
    }
}

impl fmt::Display for NewDeliveryDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewDeliveryDetection::IdDiff => f.write_str("id_diff"),
            NewDeliveryDetection::NetGrowth => f.write_str("net_growth"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub successful: usize,
    pub unsuccessful: usize,
}

impl StatusCounts {
    pub fn from_deliveries(deliveries: &[Delivery]) -> Self {
        deliveries
            .iter()
            .fold(StatusCounts::default(), |mut counts, delivery| {
                match delivery.status {
                    DeliveryStatus::Pending => counts.pending += 1,
                    DeliveryStatus::Successful => counts.successful += 1,
                    DeliveryStatus::Unsuccessful => counts.unsuccessful += 1,
                }
                counts
            })
    }

    pub fn get(&self, status: DeliveryStatus) -> usize {
        match status {
            DeliveryStatus::Pending => self.pending,
            DeliveryStatus::Successful => self.successful,
            DeliveryStatus::Unsuccessful => self.unsuccessful,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.successful + self.unsuccessful
    }
}
