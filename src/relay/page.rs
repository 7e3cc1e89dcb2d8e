//! Page-side client: posts upload requests on the window and waits for the
//! response carrying the same request id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::messages::PageMessage;
use super::window::MessageWindow;
use crate::shutdown::ShutdownCoordinator;
use crate::upload::UploadResult;

pub const RELAY_TIMEOUT_MESSAGE: &str = "Upload relay timed out";
pub const RELAY_CLOSED_MESSAGE: &str = "Upload relay closed";

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<UploadResult>>>>;

pub struct PageClient {
    window: MessageWindow,
    pending: PendingMap,
    timeout: Duration,
    shutdown: ShutdownCoordinator,
    pump: JoinHandle<()>,
}

impl PageClient {
    pub fn new(window: MessageWindow, timeout: Duration, shutdown: &ShutdownCoordinator) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let rx = window.subscribe();
        let pump = tokio::spawn(response_pump(rx, Arc::clone(&pending), shutdown.subscribe()));

        Self {
            window,
            pending,
            timeout,
            shutdown: shutdown.clone(),
            pump,
        }
    }

    /// Relay one upload; resolves exactly once with this request's result
    pub async fn upload(&self, code_array: Value) -> UploadResult {
        if self.is_closed() {
            return UploadResult::failure(RELAY_CLOSED_MESSAGE);
        }

        let request_id = uuid::Uuid::new_v4().to_string();

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        // The pump clears the map once on exit; an entry added after that never resolves
        if self.is_closed() {
            self.pending.lock().await.remove(&request_id);
            return UploadResult::failure(RELAY_CLOSED_MESSAGE);
        }

        self.window.post_message(&PageMessage::UploadRequest {
            request_id: request_id.clone(),
            code_array,
        });

        let result = tokio::time::timeout(self.timeout, rx).await;

        // Clean up the pending entry on every exit path
        self.pending.lock().await.remove(&request_id);

        match result {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => UploadResult::failure(RELAY_CLOSED_MESSAGE),
            Err(_) => {
                warn!(
                    request_id = %request_id,
                    timeout = ?self.timeout,
                    "Upload relay timed out"
                );
                UploadResult::failure(RELAY_TIMEOUT_MESSAGE)
            }
        }
    }

    /// True once shutdown has stopped, or will stop, the response pump
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_shutdown() || self.pump.is_finished()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Drop for PageClient {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn response_pump(
    mut rx: tokio::sync::broadcast::Receiver<Value>,
    pending: PendingMap,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            message = rx.recv() => {
                match message {
                    Ok(value) => route_response(&value, &pending).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Page client lagged behind window messages");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    // Dropping the senders wakes any waiter with a closed relay
    pending.lock().await.clear();
}

async fn route_response(value: &Value, pending: &PendingMap) {
    let Some(PageMessage::UploadResponse {
        request_id,
        response,
    }) = PageMessage::from_value(value)
    else {
        return;
    };

    let sender = pending.lock().await.remove(&request_id);
    match sender {
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => debug!(request_id = %request_id, "Response for unknown or finished request"),
    }
}
