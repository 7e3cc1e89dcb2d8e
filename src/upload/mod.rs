//! Deployment upload pipeline.
//!
//! validate -> build archive -> digest -> create session / transfer / prepare.
//! Every failure is converted to an `UploadResult` at this boundary.

mod archive;
mod client;
mod hashing;
mod status;
mod types;
mod validation;

pub use archive::{build_archive, read_archive, Archive};
pub use client::{UploadClient, UploadStage};
pub use hashing::{content_digest, ContentDigest};
pub use status::{
    failure_message, NoopStatus, StatusDisplay, TracingStatus, MSG_CREATING_SESSION,
    MSG_PREPARING, MSG_SUCCESS, MSG_UPLOADING,
};
pub use types::*;
pub use validation::{parse_code_array, to_code_array};

use serde_json::Value;
use tracing::{info, warn};

use crate::config::DeployConfig;
use crate::error::DeployError;

/// Archive plus digest, ready for the protocol client
#[derive(Debug, Clone)]
pub struct PackagedUpload {
    pub archive: Archive,
    pub digest: ContentDigest,
}

/// Build and digest the archive for a set of entries
pub fn package(entries: &[FileEntry]) -> Result<PackagedUpload, DeployError> {
    let archive = build_archive(entries)?;
    let digest = content_digest(archive.as_bytes());
    Ok(PackagedUpload { archive, digest })
}

/// Upload orchestrator
#[derive(Debug, Clone)]
pub struct Uploader {
    client: UploadClient,
}

impl Uploader {
    pub fn new(config: &DeployConfig) -> Result<Self, DeployError> {
        Ok(Self {
            client: UploadClient::new(config)?,
        })
    }

    /// Upload a raw code array; never fails, errors come back as `{error}`
    pub async fn perform_upload(&self, code_array: &Value) -> UploadResult {
        self.perform_upload_with_status(code_array, &NoopStatus).await
    }

    /// Same as [`Uploader::perform_upload`], reporting progress to `status`
    pub async fn perform_upload_with_status(
        &self,
        code_array: &Value,
        status: &dyn StatusDisplay,
    ) -> UploadResult {
        status.progress(MSG_UPLOADING);

        let result = match parse_code_array(code_array) {
            Ok(entries) => self.run(&entries, status).await,
            Err(e) => Err(e),
        };

        finish(result, status)
    }

    /// Upload already-validated entries
    pub async fn upload_entries(
        &self,
        entries: &[FileEntry],
        status: &dyn StatusDisplay,
    ) -> UploadResult {
        status.progress(MSG_UPLOADING);
        let result = self.run(entries, status).await;
        finish(result, status)
    }

    async fn run(
        &self,
        entries: &[FileEntry],
        status: &dyn StatusDisplay,
    ) -> Result<String, DeployError> {
        let packaged = package(entries)?;
        info!(
            files = entries.len(),
            bytes = packaged.archive.len(),
            digest = %packaged.digest,
            "Packaged source archive"
        );

        self.client
            .upload(&packaged.archive, &packaged.digest, |stage| match stage {
                UploadStage::CreateSession => status.progress(MSG_CREATING_SESSION),
                UploadStage::Transfer => status.progress(MSG_UPLOADING),
                UploadStage::Prepare => status.progress(MSG_PREPARING),
            })
            .await
    }
}

fn finish(result: Result<String, DeployError>, status: &dyn StatusDisplay) -> UploadResult {
    match &result {
        Ok(url) => {
            info!(url = %url, "Upload succeeded");
            status.success(MSG_SUCCESS);
        }
        Err(e) => {
            warn!(error = %e, "Upload failed");
            status.failure(&failure_message(&e.to_string()));
        }
    }
    UploadResult::from(result)
}
