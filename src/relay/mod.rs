//! Page -> content bridge -> background relay.
//!
//! The page posts `ZEABUR_UPLOAD_REQUEST` on a shared window, the bridge
//! forwards it as an `uploadToZeabur` runtime message, and the background
//! service's `UploadResult` comes back as `ZEABUR_UPLOAD_RESPONSE` with the
//! same request id.

mod background;
mod bridge;
mod messages;
mod page;
mod window;

pub use background::{BackgroundService, RuntimeHandle};
pub use bridge::ContentBridge;
pub use messages::{PageMessage, RuntimeRequest, UPLOAD_REQUEST_TYPE, UPLOAD_RESPONSE_TYPE};
pub use page::{PageClient, RELAY_CLOSED_MESSAGE, RELAY_TIMEOUT_MESSAGE};
pub use window::MessageWindow;

use std::sync::Arc;
use std::time::Duration;

use crate::shutdown::ShutdownCoordinator;
use crate::upload::{StatusDisplay, Uploader};

/// A fully wired relay: background service, content bridge and page client
pub struct Relay {
    pub page: PageClient,
    pub runtime: RuntimeHandle,
    pub window: MessageWindow,
}

impl Relay {
    pub fn start(
        uploader: Arc<Uploader>,
        status: Arc<dyn StatusDisplay>,
        relay_timeout: Duration,
        shutdown: &ShutdownCoordinator,
    ) -> Self {
        let window = MessageWindow::new();
        let (runtime, _service) = BackgroundService::new(uploader, status).spawn(shutdown);
        let _bridge = ContentBridge::new(window.clone(), runtime.clone()).spawn(shutdown);
        let page = PageClient::new(window.clone(), relay_timeout, shutdown);

        Self {
            page,
            runtime,
            window,
        }
    }
}
