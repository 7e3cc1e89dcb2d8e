//! Source providers: turn a directory, a saved code array or a single snippet
//! into the `FileEntry` list the upload pipeline consumes.

mod directory;
mod polling;
mod snippet;

pub use directory::DirectorySource;
pub use polling::{poll_until, PollingOptions};
pub use snippet::{detect_file_type, filename_for_language, SnippetSource};

use std::path::PathBuf;

use crate::error::{DeployError, ErrorContext};
use crate::upload::{parse_code_array, FileEntry};

pub trait SourceProvider: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    fn get_files(&self) -> Result<Vec<FileEntry>, DeployError>;
}

/// A JSON code array saved to disk, validated like any relayed request
#[derive(Debug, Clone)]
pub struct CodeArrayFileSource {
    path: PathBuf,
}

impl CodeArrayFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceProvider for CodeArrayFileSource {
    fn name(&self) -> &str {
        "code-array"
    }

    fn get_files(&self) -> Result<Vec<FileEntry>, DeployError> {
        let raw = std::fs::read_to_string(&self.path)
            .context(&format!("Failed to read {}", self.path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Code array file is not JSON");
            DeployError::InvalidInput
        })?;
        parse_code_array(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_code_array_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.json");
        std::fs::write(&path, r#"[["index.html", "<h1>Hi</h1>"], ["app.js", "run()"]]"#).unwrap();

        let files = CodeArrayFileSource::new(&path).get_files().unwrap();
        assert_eq!(
            files,
            vec![
                FileEntry::new("index.html", "<h1>Hi</h1>"),
                FileEntry::new("app.js", "run()"),
            ]
        );
    }

    #[test]
    fn test_code_array_file_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.json");

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CodeArrayFileSource::new(&path).get_files(),
            Err(DeployError::InvalidInput)
        ));

        std::fs::write(&path, r#"{"index.html": "x"}"#).unwrap();
        assert!(matches!(
            CodeArrayFileSource::new(&path).get_files(),
            Err(DeployError::InvalidInput)
        ));
    }

    #[test]
    fn test_code_array_file_missing() {
        let err = CodeArrayFileSource::new("/nonexistent/code.json")
            .get_files()
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }
}
