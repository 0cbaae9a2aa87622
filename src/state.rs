use std::sync::Arc;

use crate::board::{BoardController, BoardSettings};
use crate::error::AppError;
use crate::gateway::DeliveryGateway;
use crate::maps::MapProvider;
use crate::observability::metrics::Metrics;
use crate::pricing::PriceTable;
use crate::roster::RosterManager;

pub struct AppState {
    pub board: Arc<BoardController>,
    pub roster: RosterManager,
    pub maps: Arc<dyn MapProvider>,
    pub prices: PriceTable,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn DeliveryGateway>,
        maps: Arc<dyn MapProvider>,
        prices: PriceTable,
        board_settings: BoardSettings,
        poll_interval: std::time::Duration,
        event_buffer_size: usize,
        metrics: Metrics,
    ) -> Result<Self, AppError> {
        let board = BoardController::new(
            gateway.clone(),
            board_settings,
            poll_interval,
            event_buffer_size,
            metrics.clone(),
        )?;

        Ok(Self {
            board: Arc::new(board),
            roster: RosterManager::new(gateway),
            maps,
            prices,
            metrics,
        })
    }
}
