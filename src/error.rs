use thiserror::Error;

/// Zeabur deploy errors
///
/// The `Display` text of each variant is the message handed back to callers
/// inside an `UploadResult`, so the protocol variants carry fixed wording.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Caller passed something other than a list of `[path, content]` pairs
    #[error("Invalid code format")]
    InvalidInput,

    /// CREATE_SESSION returned non-2xx or an unusable body
    #[error("Failed to create upload session")]
    SessionCreation,

    /// PUT to the presigned URL returned non-2xx
    #[error("Failed to upload file")]
    Transfer,

    /// PREPARE returned non-2xx (server error text or HTTP status)
    #[error("Failed to prepare upload: {0}")]
    Prepare(String),

    /// Zip packaging failed
    #[error("Failed to build archive: {0}")]
    Archive(String),

    /// Source polling ran out of time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Polling or relay work stopped by shutdown
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Relay between page and background failed
    #[error("{0}")]
    Relay(String),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level HTTP failures (no response status available)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl From<zip::result::ZipError> for DeployError {
    fn from(err: zip::result::ZipError) -> Self {
        DeployError::Archive(err.to_string())
    }
}

/// Convert DeployError to String for message replies
impl From<DeployError> for String {
    fn from(err: DeployError) -> String {
        err.to_string()
    }
}

/// Helper to convert Box<dyn std::error::Error> to DeployError
impl From<Box<dyn std::error::Error>> for DeployError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        DeployError::Other(err.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, DeployError>;
}

impl<T, E: Into<DeployError>> ErrorContext<T> for Result<T, E> {
    fn context(self, msg: &str) -> Result<T, DeployError> {
        self.map_err(|e| match e.into() {
            DeployError::Other(s) => DeployError::Other(format!("{}: {}", msg, s)),
            DeployError::Config(s) => DeployError::Config(format!("{}: {}", msg, s)),
            DeployError::Archive(s) => DeployError::Archive(format!("{}: {}", msg, s)),
            DeployError::Io(e) => DeployError::Other(format!("{}: I/O error: {}", msg, e)),
            DeployError::Json(e) => DeployError::Other(format!("{}: JSON error: {}", msg, e)),
            // Protocol and relay messages are user-facing and must stay verbatim
            other => other,
        })
    }
}
