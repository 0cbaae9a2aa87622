use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until};
use tracing::{error, info, warn};

use crate::board::state::{Action, BoardSettings, Command, DeliveryBoard};
use crate::board::view::BoardSnapshot;
use crate::error::AppError;
use crate::gateway::DeliveryGateway;
use crate::models::delivery::{DeliveryId, DeliveryStatus, DeliveryType, NewDelivery};
use crate::models::driver::{Driver, DriverId};
use crate::observability::metrics::Metrics;

/// Owns one mounted board view: runs the poller, turns user intents into
/// board actions and carries the resulting commands to the backend.
pub struct BoardController {
    board: Mutex<DeliveryBoard>,
    gateway: Arc<dyn DeliveryGateway>,
    snapshots_tx: broadcast::Sender<BoardSnapshot>,
    alert_changed: Notify,
    poller: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
    metrics: Metrics,
}

impl BoardController {
    pub fn new(
        gateway: Arc<dyn DeliveryGateway>,
        settings: BoardSettings,
        poll_interval: Duration,
        event_buffer_size: usize,
        metrics: Metrics,
    ) -> Result<Self, AppError> {
        if poll_interval.is_zero() {
            return Err(AppError::Internal(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if event_buffer_size == 0 {
            return Err(AppError::Internal(
                "event buffer size must be greater than zero".to_string(),
            ));
        }

        let (snapshots_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Ok(Self {
            board: Mutex::new(DeliveryBoard::new(settings)),
            gateway,
            snapshots_tx,
            alert_changed: Notify::new(),
            poller: Mutex::new(None),
            poll_interval,
            metrics,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardSnapshot> {
        self.snapshots_tx.subscribe()
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.board.lock().await.snapshot()
    }

    pub async fn is_mounted(&self) -> bool {
        self.board.lock().await.is_mounted()
    }

    /// Starts a fresh view: drivers are fetched once, deliveries immediately
    /// and then on every poll tick until [`BoardController::unmount`].
    pub async fn mount(self: &Arc<Self>) {
        let mut poller = self.poller.lock().await;
        if let Some(previous) = poller.take() {
            previous.abort();
        }

        let _ = self.apply(Action::Mount).await;
        *poller = Some(tokio::spawn(run_poller(Arc::clone(self))));
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "delivery board mounted");
    }

    /// Stops polling. Results of requests still in flight are discarded by
    /// the epoch check.
    pub async fn unmount(&self) {
        if let Some(poller) = self.poller.lock().await.take() {
            poller.abort();
        }
        let _ = self.apply(Action::Unmount).await;
        info!("delivery board unmounted");
    }

    pub async fn load_drivers(&self) -> Result<(), AppError> {
        let drivers = self.gateway.list_drivers().await.inspect_err(|err| {
            warn!(error = %err, "failed to fetch drivers");
        })?;
        self.set_drivers(drivers).await;
        Ok(())
    }

    pub async fn set_drivers(&self, drivers: Vec<Driver>) {
        let _ = self.apply(Action::DriversLoaded(drivers)).await;
    }

    pub async fn refresh(&self) -> Result<(), AppError> {
        let epoch = self.board.lock().await.epoch();

        match self.gateway.list_deliveries().await {
            Ok(deliveries) => {
                self.metrics.polls_total.with_label_values(&["success"]).inc();
                self.apply(Action::Refreshed {
                    epoch,
                    deliveries,
                    at: Instant::now(),
                })
                .await?;
                Ok(())
            }
            Err(err) => {
                self.metrics.polls_total.with_label_values(&["error"]).inc();
                warn!(error = %err, "failed to fetch deliveries");
                self.apply(Action::RefreshFailed {
                    epoch,
                    message: err.to_string(),
                })
                .await?;
                Err(err)
            }
        }
    }

    pub async fn expire_alert(&self) {
        let _ = self.apply(Action::ExpireAlert { at: Instant::now() }).await;
    }

    pub async fn set_filter(&self, status: DeliveryStatus) -> BoardSnapshot {
        let _ = self.apply(Action::SetFilter(status)).await;
        self.snapshot().await
    }

    pub async fn set_page(&self, page: usize) -> Result<BoardSnapshot, AppError> {
        self.apply(Action::SetPage(page)).await?;
        Ok(self.snapshot().await)
    }

    pub async fn mark_successful(self: &Arc<Self>, id: DeliveryId) -> Result<String, AppError> {
        self.perform(Action::MarkSuccessful(id)).await?;
        Ok("Delivery marked as successful.".to_string())
    }

    pub async fn mark_unsuccessful(
        self: &Arc<Self>,
        id: DeliveryId,
        reason: String,
    ) -> Result<String, AppError> {
        self.perform(Action::MarkUnsuccessful { id, reason }).await?;
        Ok("Delivery marked as unsuccessful with reason saved.".to_string())
    }

    pub async fn set_price(
        self: &Arc<Self>,
        id: DeliveryId,
        price: u32,
    ) -> Result<String, AppError> {
        self.perform(Action::SetPrice { id, price }).await?;
        Ok(format!("Price set to {price}."))
    }

    pub async fn set_delivery_type(
        self: &Arc<Self>,
        id: DeliveryId,
        delivery_type: DeliveryType,
    ) -> Result<String, AppError> {
        self.perform(Action::SetDeliveryType { id, delivery_type })
            .await?;
        Ok(format!("Delivery type set to {delivery_type}."))
    }

    pub async fn assign_driver(
        self: &Arc<Self>,
        id: DeliveryId,
        driver_id: DriverId,
    ) -> Result<String, AppError> {
        self.perform(Action::AssignDriver {
            id: id.clone(),
            driver_id: driver_id.clone(),
        })
        .await?;

        let board = self.board.lock().await;
        let name = board
            .driver_name(&driver_id)
            .map(str::to_string)
            .unwrap_or_else(|| driver_id.to_string());
        let (delivery_type, price) = board
            .delivery(&id)
            .map(|delivery| (delivery.delivery_type, delivery.price))
            .unwrap_or_default();

        Ok(format!(
            "Driver \"{name}\" assigned with {} delivery (Price: {})",
            delivery_type.map_or("unknown", |kind| kind.as_str()),
            price.map_or_else(|| "-".to_string(), |price| price.to_string()),
        ))
    }

    pub async fn notify_driver(self: &Arc<Self>, id: DeliveryId) -> Result<String, AppError> {
        self.perform(Action::NotifyDriver(id)).await?;
        Ok("Driver and customers notified successfully!".to_string())
    }

    pub async fn delete_delivery(
        self: &Arc<Self>,
        id: DeliveryId,
        confirmed: bool,
    ) -> Result<String, AppError> {
        if self.perform(Action::Delete { id, confirmed }).await? {
            Ok("Delivery deleted.".to_string())
        } else {
            Ok("Deletion cancelled.".to_string())
        }
    }

    pub async fn add_delivery(&self, form: NewDelivery) -> Result<String, AppError> {
        form.validate()?;
        self.gateway.add_delivery(&form).await.inspect_err(|err| {
            error!(error = %err, "failed to add delivery");
        })?;

        // The new record shows up through the regular refresh path.
        let _ = self.refresh().await;
        Ok("Delivery added successfully!".to_string())
    }

    /// Applies an action locally, then makes the backend call it produced.
    /// Returns whether a call was made. The call and its settlement run on
    /// their own task, so a caller that goes away never strands a write in
    /// the pending log.
    async fn perform(self: &Arc<Self>, action: Action) -> Result<bool, AppError> {
        let command = self.apply(action).await.inspect_err(|err| {
            warn!(error = %err, "board action rejected");
        })?;
        let Some(command) = command else {
            return Ok(false);
        };

        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.execute_and_settle(command).await })
            .await
            .map_err(|err| AppError::Internal(format!("backend write task failed: {err}")))??;

        Ok(true)
    }

    async fn execute_and_settle(&self, command: Command) -> Result<(), AppError> {
        let result = self.execute(&command).await;
        let outcome = match &result {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(
                    operation = command.operation(),
                    delivery_id = %command.delivery_id(),
                    error = %err,
                    "backend write failed"
                );
                Err(err.to_string())
            }
        };

        self.apply(Action::Settled {
            seq: command.seq(),
            outcome,
        })
        .await?;

        result
    }

    async fn execute(&self, command: &Command) -> Result<(), AppError> {
        match command {
            Command::UpdateStatus {
                id, status, reason, ..
            } => {
                self.gateway
                    .update_delivery_status(id, *status, reason.as_deref())
                    .await
            }
            Command::UpdateField { id, field, .. } => {
                self.gateway.update_delivery_field(id, *field).await
            }
            Command::AssignDriver { assignment, .. } => {
                self.gateway.assign_driver(assignment).await
            }
            Command::NotifyDriver { id, .. } => self.gateway.notify_driver(id).await,
            Command::DeleteDelivery { id, .. } => self.gateway.delete_delivery(id).await,
        }
    }

    async fn apply(&self, action: Action) -> Result<Option<Command>, AppError> {
        let mut board = self.board.lock().await;
        let deadline_before = board.alert_deadline();

        let result = board.dispatch(action);

        let deadline_after = board.alert_deadline();
        if deadline_after != deadline_before {
            if deadline_after.is_some() {
                self.metrics.new_delivery_alerts_total.inc();
                info!("new delivery received");
            }
            self.alert_changed.notify_one();
        }

        self.metrics.record_counts(&board.counts());
        if self.snapshots_tx.receiver_count() > 0 {
            let _ = self.snapshots_tx.send(board.snapshot());
        }

        result
    }
}

async fn run_poller(controller: Arc<BoardController>) {
    let _ = controller.load_drivers().await;

    let mut ticker = interval(controller.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let deadline = controller.board.lock().await.alert_deadline();

        tokio::select! {
            _ = ticker.tick() => {
                let _ = controller.refresh().await;
            }
            _ = alert_expiry(deadline) => {
                controller.expire_alert().await;
            }
            _ = controller.alert_changed.notified() => {}
        }
    }
}

async fn alert_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
