//! Type definitions for the upload pipeline.
//!
//! Defines FileEntry, the wire bodies of the three-step upload protocol,
//! and UploadResult, the single terminal outcome of an upload attempt.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const CONTENT_HASH_ALGORITHM: &str = "sha256";
pub const UPLOAD_TYPE_NEW_PROJECT: &str = "new_project";

/// One source file as produced by a site adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Body of `POST /v2/upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub content_hash: String,
    pub content_hash_algorithm: String,
    pub content_length: u64,
}

/// Server-assigned upload session, consumed once by the transfer step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub presign_url: String,
    /// Header values as sent by the service; scalars are turned into header text
    #[serde(default)]
    pub presign_header: HashMap<String, serde_json::Value>,
    pub upload_id: String,
}

/// Body of `POST /v2/upload/{upload_id}/prepare`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub upload_type: String,
}

impl Default for PrepareRequest {
    fn default() -> Self {
        Self {
            upload_type: UPLOAD_TYPE_NEW_PROJECT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrepareResponse {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorResponse {
    pub error: Option<serde_json::Value>,
}

/// Terminal outcome of one upload attempt.
///
/// On the wire this is `{"success": true, "url": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "UploadResultWire", try_from = "UploadResultWire")]
pub enum UploadResult {
    Success { url: String },
    Failure { error: String },
}

impl UploadResult {
    pub fn success(url: impl Into<String>) -> Self {
        UploadResult::Success { url: url.into() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        UploadResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            UploadResult::Success { url } => Some(url),
            UploadResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UploadResult::Success { .. } => None,
            UploadResult::Failure { error } => Some(error),
        }
    }
}

impl From<Result<String, crate::error::DeployError>> for UploadResult {
    fn from(result: Result<String, crate::error::DeployError>) -> Self {
        match result {
            Ok(url) => UploadResult::success(url),
            Err(e) => UploadResult::failure(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UploadResultWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<UploadResult> for UploadResultWire {
    fn from(result: UploadResult) -> Self {
        match result {
            UploadResult::Success { url } => Self {
                success: Some(true),
                url: Some(url),
                error: None,
            },
            UploadResult::Failure { error } => Self {
                success: None,
                url: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<UploadResultWire> for UploadResult {
    type Error = String;

    fn try_from(wire: UploadResultWire) -> Result<Self, Self::Error> {
        // An error field wins, matching how callers check `response.error` first
        if let Some(error) = wire.error {
            return Ok(UploadResult::Failure { error });
        }
        match (wire.success, wire.url) {
            (Some(true), Some(url)) => Ok(UploadResult::Success { url }),
            _ => Err("upload result has neither an error nor a successful url".to_string()),
        }
    }
}
