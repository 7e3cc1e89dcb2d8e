//! Three-step upload protocol against the deployment service.
//!
//! CREATE_SESSION -> TRANSFER -> PREPARE, strictly in order, no retries.
//! Any failed step ends the attempt with a single error.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use super::archive::Archive;
use super::hashing::ContentDigest;
use super::types::{
    CreateSessionRequest, PrepareRequest, PrepareResponse, ServiceErrorResponse, UploadSession,
    CONTENT_HASH_ALGORITHM,
};
use crate::config::DeployConfig;
use crate::error::DeployError;

/// Protocol step, used for progress reporting and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    CreateSession,
    Transfer,
    Prepare,
}

#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    base_url: String,
}

impl UploadClient {
    pub fn new(config: &DeployConfig) -> Result<Self, DeployError> {
        let base = Url::parse(config.api_base_url.trim()).map_err(|e| {
            DeployError::Config(format!("Invalid API base URL '{}': {}", config.api_base_url, e))
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Run all three steps and return the deployment URL
    pub async fn upload(
        &self,
        archive: &Archive,
        digest: &ContentDigest,
        mut on_stage: impl FnMut(UploadStage),
    ) -> Result<String, DeployError> {
        on_stage(UploadStage::CreateSession);
        let session = self.create_session(digest, archive.len() as u64).await?;

        on_stage(UploadStage::Transfer);
        self.transfer(&session, archive).await?;

        on_stage(UploadStage::Prepare);
        self.prepare(&session.upload_id).await
    }

    /// CREATE_SESSION: `POST /v2/upload`
    pub async fn create_session(
        &self,
        digest: &ContentDigest,
        content_length: u64,
    ) -> Result<UploadSession, DeployError> {
        let body = CreateSessionRequest {
            content_hash: digest.to_string(),
            content_hash_algorithm: CONTENT_HASH_ALGORITHM.to_string(),
            content_length,
        };

        let response = self
            .http
            .post(self.build_url("/v2/upload"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Upload session request rejected");
            return Err(DeployError::SessionCreation);
        }

        let session: UploadSession = response.json().await.map_err(|e| {
            warn!(error = %e, "Upload session response is missing required fields");
            DeployError::SessionCreation
        })?;

        info!(upload_id = %session.upload_id, content_length, "Created upload session");
        Ok(session)
    }

    /// TRANSFER: `PUT presign_url` with the presigned headers and raw bytes
    pub async fn transfer(
        &self,
        session: &UploadSession,
        archive: &Archive,
    ) -> Result<(), DeployError> {
        let headers = presign_headers(session)?;

        let response = self
            .http
            .put(&session.presign_url)
            .headers(headers)
            .body(archive.as_bytes().to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, upload_id = %session.upload_id, "Presigned upload rejected");
            return Err(DeployError::Transfer);
        }

        debug!(upload_id = %session.upload_id, bytes = archive.len(), "Transferred archive");
        Ok(())
    }

    /// PREPARE: `POST /v2/upload/{upload_id}/prepare`, returns the deployment URL
    pub async fn prepare(&self, upload_id: &str) -> Result<String, DeployError> {
        let response = self
            .http
            .post(self.build_url(&format!("/v2/upload/{}/prepare", upload_id)))
            .header(CONTENT_TYPE, "application/json")
            .json(&PrepareRequest::default())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = prepare_failure_reason(status, &body);
            warn!(%status, upload_id, reason = %reason, "Prepare request rejected");
            return Err(DeployError::Prepare(reason));
        }

        let prepared: PrepareResponse = response.json().await.map_err(|e| {
            warn!(error = %e, upload_id, "Prepare response has no url");
            DeployError::Prepare("response did not include a deployment url".to_string())
        })?;

        info!(upload_id, url = %prepared.url, "Upload prepared");
        Ok(prepared.url)
    }
}

fn presign_headers(session: &UploadSession) -> Result<HeaderMap, DeployError> {
    let mut headers = HeaderMap::with_capacity(session.presign_header.len());
    for (name, value) in &session.presign_header {
        let name = HeaderName::from_bytes(name.as_bytes());
        let value = header_text(value).and_then(|text| HeaderValue::from_str(&text).ok());
        match (name, value) {
            (Ok(name), Some(value)) => {
                headers.insert(name, value);
            }
            _ => {
                warn!(
                    upload_id = %session.upload_id,
                    "Presigned header is not a valid HTTP header"
                );
                return Err(DeployError::Transfer);
            }
        }
    }
    Ok(headers)
}

/// Strings, numbers and bools become header text; anything else is rejected
fn header_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Server error text when the body carries one, else the HTTP status
fn prepare_failure_reason(status: StatusCode, body: &str) -> String {
    let server_error = serde_json::from_str::<ServiceErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|error| match error {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });

    server_error.unwrap_or_else(|| format!("HTTP {}", status))
}
