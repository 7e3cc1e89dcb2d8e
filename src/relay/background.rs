//! Background service: owns the uploader and answers runtime messages.
//!
//! Each request runs on its own task, so concurrent uploads never share state
//! and a slow upload does not hold up the next message.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messages::RuntimeRequest;
use crate::error::DeployError;
use crate::shutdown::ShutdownCoordinator;
use crate::upload::{StatusDisplay, UploadResult, Uploader};

const RUNTIME_QUEUE_CAPACITY: usize = 32;

struct RuntimeEnvelope {
    request: RuntimeRequest,
    reply: oneshot::Sender<UploadResult>,
}

/// Sending side of the runtime channel, cloned into every bridge
#[derive(Clone)]
pub struct RuntimeHandle {
    tx: mpsc::Sender<RuntimeEnvelope>,
}

impl RuntimeHandle {
    /// Deliver a request and wait for its single reply
    pub async fn send_message(&self, request: RuntimeRequest) -> Result<UploadResult, DeployError> {
        let (reply, rx) = oneshot::channel();

        self.tx
            .send(RuntimeEnvelope { request, reply })
            .await
            .map_err(|_| DeployError::Relay("Background service is not running".to_string()))?;

        rx.await
            .map_err(|_| DeployError::Relay("Background service dropped the request".to_string()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct BackgroundService {
    uploader: Arc<Uploader>,
    status: Arc<dyn StatusDisplay>,
}

impl BackgroundService {
    pub fn new(uploader: Arc<Uploader>, status: Arc<dyn StatusDisplay>) -> Self {
        Self { uploader, status }
    }

    /// Start the receive loop; it stops on shutdown or when every handle is dropped
    pub fn spawn(self, shutdown: &ShutdownCoordinator) -> (RuntimeHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<RuntimeEnvelope>(RUNTIME_QUEUE_CAPACITY);
        let mut shutdown_rx = shutdown.subscribe();

        let handle = tokio::spawn(async move {
            info!("Background service started");

            loop {
                tokio::select! {
                    envelope = rx.recv() => {
                        match envelope {
                            Some(envelope) => self.dispatch(envelope),
                            None => {
                                debug!("All runtime handles dropped");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Background service shutting down");
                        break;
                    }
                }
            }
        });

        (RuntimeHandle { tx }, handle)
    }

    fn dispatch(&self, envelope: RuntimeEnvelope) {
        let uploader = Arc::clone(&self.uploader);
        let status = Arc::clone(&self.status);

        tokio::spawn(async move {
            let RuntimeEnvelope { request, reply } = envelope;
            let result = match request {
                RuntimeRequest::UploadToZeabur { code_array } => {
                    uploader
                        .perform_upload_with_status(&code_array, status.as_ref())
                        .await
                }
            };

            if reply.send(result).is_err() {
                warn!("Requester went away before the upload finished");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::upload::NoopStatus;
    use serde_json::json;

    fn service() -> BackgroundService {
        let uploader =
            Uploader::new(&DeployConfig::with_api_base_url("http://127.0.0.1:9")).unwrap();
        BackgroundService::new(Arc::new(uploader), Arc::new(NoopStatus))
    }

    #[tokio::test]
    async fn test_invalid_request_answered() {
        let shutdown = ShutdownCoordinator::new();
        let (runtime, _task) = service().spawn(&shutdown);

        let result = runtime
            .send_message(RuntimeRequest::upload(json!("not an array")))
            .await
            .unwrap();

        assert_eq!(result, UploadResult::failure("Invalid code format"));
    }

    #[tokio::test]
    async fn test_send_after_shutdown_is_relay_error() {
        let shutdown = ShutdownCoordinator::new();
        let (runtime, task) = service().spawn(&shutdown);

        shutdown.shutdown();
        task.await.unwrap();

        let err = runtime
            .send_message(RuntimeRequest::upload(json!([])))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Relay(_)));
        assert!(runtime.is_closed());
    }
}
