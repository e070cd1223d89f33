use std::sync::Arc;

use aeroflow_core::events::{DomainEvent, EventPublisher};
use aeroflow_shared::models::events::PassengerNotification;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// ============================================================================
// Publisher
// ============================================================================

/// Broadcasts live events to SSE subscribers and queues passenger
/// notifications for the delivery worker. Never blocks the caller.
pub struct ApiPublisher {
    events: broadcast::Sender<DomainEvent>,
    outbox: mpsc::Sender<PassengerNotification>,
}

impl ApiPublisher {
    pub fn new(
        events: broadcast::Sender<DomainEvent>,
        outbox: mpsc::Sender<PassengerNotification>,
    ) -> Self {
        Self { events, outbox }
    }
}

impl EventPublisher for ApiPublisher {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        // No subscribers is normal.
        if self.events.send(event).is_err() {
            debug!(event = name, "No live subscribers");
        }
    }

    fn notify(&self, notification: PassengerNotification) {
        match self.outbox.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(n)) => {
                warn!(booking = %n.booking_reference, kind = ?n.kind, "Notification queue full, dropping");
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                warn!(booking = %n.booking_reference, kind = ?n.kind, "Notification worker stopped, dropping");
            }
        }
    }
}

// ============================================================================
// Delivery
// ============================================================================

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &PassengerNotification) -> anyhow::Result<()>;
}

/// Writes notifications to the log. The email address stays masked.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn deliver(&self, notification: &PassengerNotification) -> anyhow::Result<()> {
        info!(
            to = %notification.email,
            booking = %notification.booking_reference,
            flight = %notification.flight_number,
            "{}",
            notification.subject()
        );
        Ok(())
    }
}

#[cfg(feature = "kafka")]
pub struct KafkaNotifier {
    producer: aeroflow_store::NotificationProducer,
}

#[cfg(feature = "kafka")]
impl KafkaNotifier {
    pub fn new(producer: aeroflow_store::NotificationProducer) -> Self {
        Self { producer }
    }
}

#[cfg(feature = "kafka")]
#[async_trait]
impl Notifier for KafkaNotifier {
    async fn deliver(&self, notification: &PassengerNotification) -> anyhow::Result<()> {
        self.producer.publish_notification(notification).await?;
        Ok(())
    }
}

/// Drains the notification queue until every sender is dropped.
/// Failures are logged and not retried.
pub fn spawn_notification_worker(
    mut rx: mpsc::Receiver<PassengerNotification>,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Notification worker started");
        while let Some(notification) = rx.recv().await {
            if let Err(e) = notifier.deliver(&notification).await {
                warn!(
                    booking = %notification.booking_reference,
                    "Failed to deliver notification: {:#}", e
                );
            }
        }
        info!("Notification worker stopped");
    })
}
