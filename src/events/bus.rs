use super::types::{EventSequence, StatusEvent, StatusPayload};
use crate::upload::StatusDisplay;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

pub type EventReceiver = broadcast::Receiver<StatusEvent>;
pub type EventSender = broadcast::Sender<StatusEvent>;

/// Event bus for distributing upload status events
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: EventSender,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publish an event (returns sequence number)
    pub fn publish(&self, payload: StatusPayload) -> Result<EventSequence, String> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        let event = StatusEvent {
            sequence,
            timestamp: Utc::now(),
            payload,
        };

        self.sender
            .send(event)
            .map(|_| sequence)
            .map_err(|e| format!("Failed to publish event: {}", e))
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }
}

/// Status display that publishes every signal on an [`EventBus`]
#[derive(Clone, Debug)]
pub struct BusStatusDisplay {
    bus: EventBus,
}

impl BusStatusDisplay {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    fn emit(&self, payload: StatusPayload) {
        // Nobody listening is fine; status is informational only
        let _ = self.bus.publish(payload);
    }
}

impl StatusDisplay for BusStatusDisplay {
    fn progress(&self, message: &str) {
        self.emit(StatusPayload::Progress {
            message: message.to_string(),
        });
    }

    fn success(&self, message: &str) {
        self.emit(StatusPayload::Success {
            message: message.to_string(),
        });
    }

    fn failure(&self, message: &str) {
        self.emit(StatusPayload::Failure {
            message: message.to_string(),
        });
    }
}
