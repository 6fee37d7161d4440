use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    OrderPlaced {
        order_id: Uuid,
        order_number: String,
        total: Decimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    StockAdjusted {
        product_id: Uuid,
        size: String,
        color: String,
        quantity: i32,
    },
    LowStock {
        product_id: Uuid,
        sku: String,
    },
    ProductRetired(Uuid),
    SchoolRetired(Uuid),
    InquiryReceived(Uuid),
    AdminRegistered(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!(error = %err, "dropping domain event");
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStock { product_id, sku } => {
                warn!(product_id = %product_id, sku = %sku, "product stock is running low");
            }
            Event::OrderPlaced {
                order_id,
                order_number,
                total,
            } => {
                info!(order_id = %order_id, order_number = %order_number, total = %total, "order placed");
            }
            other => info!(event = ?other, "domain event"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::SchoolRetired(id)).await.unwrap();
        assert_eq!(rx.recv().await, Some(Event::SchoolRetired(id)));
    }

    #[tokio::test]
    async fn send_or_log_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::ProductRetired(Uuid::nil())).await.is_err());
        sender.send_or_log(Event::ProductRetired(Uuid::nil())).await;
    }
}
