use super::{EventBus, StatusEvent, StatusPayload};
use crate::shutdown::ShutdownCoordinator;
use std::io::Write;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Renders status events as single-line toasts on a writer (stderr in the CLI)
pub struct ConsoleStatusHandler<W> {
    event_bus: EventBus,
    shutdown: ShutdownCoordinator,
    writer: W,
}

impl<W: Write + Send + 'static> ConsoleStatusHandler<W> {
    pub fn new(event_bus: EventBus, shutdown: ShutdownCoordinator, writer: W) -> Self {
        Self {
            event_bus,
            shutdown,
            writer,
        }
    }

    /// Run until a terminal status (success/failure) is rendered or shutdown.
    /// Returns the terminal event, if one was seen.
    pub fn start(mut self) -> JoinHandle<Option<StatusEvent>> {
        // Subscribe before spawning so no event published after start() is missed
        let mut rx = self.event_bus.subscribe();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = rx.recv() => {
                        match result {
                            Ok(event) => {
                                self.render(&event);
                                if event.payload.is_terminal() {
                                    return Some(event);
                                }
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                debug!("Status handler stopped (event bus closed)");
                                return None;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!(skipped = n, "Status handler lagged");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Status handler shutting down");
                        return None;
                    }
                }
            }
        })
    }

    fn render(&mut self, event: &StatusEvent) {
        let marker = match &event.payload {
            StatusPayload::Progress { .. } => "…",
            StatusPayload::Success { .. } => "✓",
            StatusPayload::Failure { .. } => "✕",
        };
        let _ = writeln!(self.writer, "{} {}", marker, event.payload.message());
        let _ = self.writer.flush();
    }
}
