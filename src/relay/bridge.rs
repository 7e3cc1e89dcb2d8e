//! Content bridge: forwards page upload requests to the background service
//! and posts the reply back under the same request id.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::background::RuntimeHandle;
use super::messages::{PageMessage, RuntimeRequest};
use super::window::MessageWindow;
use crate::shutdown::ShutdownCoordinator;
use crate::upload::UploadResult;

pub struct ContentBridge {
    window: MessageWindow,
    runtime: RuntimeHandle,
}

impl ContentBridge {
    pub fn new(window: MessageWindow, runtime: RuntimeHandle) -> Self {
        Self { window, runtime }
    }

    pub fn spawn(self, shutdown: &ShutdownCoordinator) -> JoinHandle<()> {
        let mut rx = self.window.subscribe();
        let mut shutdown_rx = shutdown.subscribe();

        tokio::spawn(async move {
            info!("Content bridge listening");

            loop {
                tokio::select! {
                    message = rx.recv() => {
                        match message {
                            Ok(value) => {
                                if let Some(PageMessage::UploadRequest { request_id, code_array }) =
                                    PageMessage::from_value(&value)
                                {
                                    self.forward(request_id, code_array);
                                }
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                warn!(skipped, "Content bridge lagged behind window messages");
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Content bridge shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn forward(&self, request_id: String, code_array: serde_json::Value) {
        let runtime = self.runtime.clone();
        let window = self.window.clone();

        tokio::spawn(async move {
            debug!(request_id = %request_id, "Forwarding upload request");

            let response = match runtime.send_message(RuntimeRequest::upload(code_array)).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(request_id = %request_id, error = %e, "Relay to background failed");
                    UploadResult::failure(e.to_string())
                }
            };

            window.post_message(&PageMessage::UploadResponse {
                request_id,
                response,
            });
        });
    }
}
