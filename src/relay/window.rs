//! Shared page window: every participant sees every posted message.

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::messages::PageMessage;

const WINDOW_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct MessageWindow {
    sender: broadcast::Sender<Value>,
}

impl MessageWindow {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(WINDOW_CAPACITY);
        Self { sender }
    }

    /// Post a typed message to all listeners
    pub fn post_message(&self, message: &PageMessage) {
        match serde_json::to_value(message) {
            Ok(value) => self.post_raw(value),
            Err(e) => debug!(error = %e, "Failed to serialize window message"),
        }
    }

    /// Post an arbitrary value, as any script on the page could
    pub fn post_raw(&self, value: Value) {
        // No listeners is not an error for window messages
        let _ = self.sender.send(value);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.sender.subscribe()
    }
}

impl Default for MessageWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_every_listener_sees_message() {
        let window = MessageWindow::new();
        let mut a = window.subscribe();
        let mut b = window.subscribe();

        window.post_raw(json!({"type": "PING"}));

        assert_eq!(a.recv().await.unwrap(), json!({"type": "PING"}));
        assert_eq!(b.recv().await.unwrap(), json!({"type": "PING"}));
    }

    #[test]
    fn test_post_without_listeners() {
        let window = MessageWindow::new();
        window.post_raw(json!(1));
    }
}
