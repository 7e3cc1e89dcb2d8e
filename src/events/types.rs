use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sequence number for ordering events
pub type EventSequence = u64;

/// How long a success toast stays up
pub const SUCCESS_DISPLAY_MS: u64 = 3000;
/// How long a failure toast stays up
pub const FAILURE_DISPLAY_MS: u64 = 5000;

/// One status signal emitted during an upload attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub sequence: EventSequence,
    pub timestamp: DateTime<Utc>,
    pub payload: StatusPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusPayload {
    /// Work in progress; stays visible until replaced
    Progress { message: String },

    /// Upload finished with a deployment URL
    Success { message: String },

    /// Upload failed
    Failure { message: String },
}

impl StatusPayload {
    pub fn message(&self) -> &str {
        match self {
            StatusPayload::Progress { message } => message,
            StatusPayload::Success { message } => message,
            StatusPayload::Failure { message } => message,
        }
    }

    pub fn payload_type(&self) -> &str {
        match self {
            StatusPayload::Progress { .. } => "progress",
            StatusPayload::Success { .. } => "success",
            StatusPayload::Failure { .. } => "failure",
        }
    }

    /// Auto-dismiss delay; `None` means the status stays until replaced
    pub fn display_duration(&self) -> Option<Duration> {
        match self {
            StatusPayload::Progress { .. } => None,
            StatusPayload::Success { .. } => Some(Duration::from_millis(SUCCESS_DISPLAY_MS)),
            StatusPayload::Failure { .. } => Some(Duration::from_millis(FAILURE_DISPLAY_MS)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusPayload::Progress { .. })
    }
}
