//! Message shapes exchanged between the page, the content bridge and the
//! background service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::upload::UploadResult;

pub const UPLOAD_REQUEST_TYPE: &str = "ZEABUR_UPLOAD_REQUEST";
pub const UPLOAD_RESPONSE_TYPE: &str = "ZEABUR_UPLOAD_RESPONSE";

/// Runtime message delivered to the background service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum RuntimeRequest {
    #[serde(rename = "uploadToZeabur")]
    UploadToZeabur {
        #[serde(rename = "codeArray")]
        code_array: Value,
    },
}

impl RuntimeRequest {
    pub fn upload(code_array: Value) -> Self {
        RuntimeRequest::UploadToZeabur { code_array }
    }
}

/// Message posted on the shared page window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
    #[serde(rename = "ZEABUR_UPLOAD_REQUEST")]
    UploadRequest {
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(rename = "codeArray")]
        code_array: Value,
    },
    #[serde(rename = "ZEABUR_UPLOAD_RESPONSE")]
    UploadResponse {
        #[serde(rename = "requestId")]
        request_id: String,
        response: UploadResult,
    },
}

impl PageMessage {
    pub fn request_id(&self) -> &str {
        match self {
            PageMessage::UploadRequest { request_id, .. } => request_id,
            PageMessage::UploadResponse { request_id, .. } => request_id,
        }
    }

    /// Parse a raw window message; anything unrecognised is not ours
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_runtime_request_wire_shape() {
        let request = RuntimeRequest::upload(json!([["a.txt", "x"]]));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"action": "uploadToZeabur", "codeArray": [["a.txt", "x"]]})
        );
    }

    #[test]
    fn test_page_request_wire_shape() {
        let message = PageMessage::UploadRequest {
            request_id: "r1".to_string(),
            code_array: json!([]),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": UPLOAD_REQUEST_TYPE, "requestId": "r1", "codeArray": []})
        );
    }

    #[test]
    fn test_page_response_parses_error_result() {
        let raw = json!({
            "type": UPLOAD_RESPONSE_TYPE,
            "requestId": "r2",
            "response": {"error": "Failed to upload file"}
        });

        let message = PageMessage::from_value(&raw).unwrap();
        assert_eq!(message.request_id(), "r2");
        assert_eq!(
            message,
            PageMessage::UploadResponse {
                request_id: "r2".to_string(),
                response: UploadResult::failure("Failed to upload file"),
            }
        );
    }

    #[test]
    fn test_foreign_window_message_ignored() {
        assert!(PageMessage::from_value(&json!({"type": "SOMETHING_ELSE"})).is_none());
        assert!(PageMessage::from_value(&json!("hello")).is_none());
    }
}
