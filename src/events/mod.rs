use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Domain events emitted after a posting transaction commits.
///
/// Events are strictly post-commit: a voucher that failed to post never
/// produces one, and a failure to enqueue never rolls a committed
/// voucher back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    VoucherPosted {
        voucher_id: Uuid,
        kind: String,
        line_count: usize,
        posted_by: String,
        occurred_at: DateTime<Utc>,
    },
    ProductRegistered {
        product_id: Uuid,
        item: String,
        series: String,
        category: String,
        occurred_at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::VoucherPosted { .. } => "voucher_posted",
            Event::ProductRegistered { .. } => "product_registered",
        }
    }
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Failed to send event: {0}")]
    SendError(String),
}

/// Cloneable handle for publishing events onto the internal channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), EventError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| EventError::SendError(e.to_string()))
    }
}

/// Creates the event channel with the given capacity.
pub fn create_event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Consumes events off the channel until all senders are dropped.
///
/// For now the consumer only logs; it is the seam where webhooks or a
/// message broker would attach.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => {
                tracing::info!(event = event.name(), payload = %payload, "Processing event")
            }
            Err(e) => tracing::error!(event = event.name(), error = %e, "Failed to serialize event"),
        }
    }
    tracing::debug!("Event channel closed, consumer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_and_receive_roundtrip() {
        let (sender, mut receiver) = create_event_channel(8);
        let id = Uuid::new_v4();
        sender
            .send(Event::VoucherPosted {
                voucher_id: id,
                kind: "incoming".to_string(),
                line_count: 2,
                posted_by: "ops".to_string(),
                occurred_at: Utc::now(),
            })
            .await
            .unwrap();

        match receiver.recv().await.unwrap() {
            Event::VoucherPosted {
                voucher_id,
                line_count,
                ..
            } => {
                assert_eq!(voucher_id, id);
                assert_eq!(line_count, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = Event::ProductRegistered {
            product_id: Uuid::new_v4(),
            item: "1001".to_string(),
            series: "A".to_string(),
            category: "Shirt".to_string(),
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"product_registered\""));
    }
}
