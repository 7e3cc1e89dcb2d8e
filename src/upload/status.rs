//! Status display capability for upload progress.
//!
//! Purely informational; `UploadResult` stays the authoritative outcome.

use tracing::{error, info};

pub const MSG_UPLOADING: &str = "Uploading to Zeabur...";
pub const MSG_CREATING_SESSION: &str = "Creating upload session...";
pub const MSG_PREPARING: &str = "Preparing deployment...";
pub const MSG_SUCCESS: &str = "Upload successful! Redirecting to Zeabur...";

pub fn failure_message(error: &str) -> String {
    format!("Upload failed: {}", error)
}

pub trait StatusDisplay: Send + Sync {
    fn progress(&self, message: &str);
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Discards all status signals
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatus;

impl StatusDisplay for NoopStatus {
    fn progress(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn failure(&self, _message: &str) {}
}

/// Writes status signals to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatus;

impl StatusDisplay for TracingStatus {
    fn progress(&self, message: &str) {
        info!(status = "progress", "{}", message);
    }

    fn success(&self, message: &str) {
        info!(status = "success", "{}", message);
    }

    fn failure(&self, message: &str) {
        error!(status = "failure", "{}", message);
    }
}
