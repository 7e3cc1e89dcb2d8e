use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::SourceProvider;
use crate::error::DeployError;
use crate::upload::FileEntry;

/// Project directory on disk; honours `.gitignore` and skips hidden files
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceProvider for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    fn get_files(&self) -> Result<Vec<FileEntry>, DeployError> {
        if !self.root.is_dir() {
            return Err(DeployError::Other(format!(
                "Not a directory: {}",
                self.root.display()
            )));
        }

        let walker = WalkBuilder::new(&self.root)
            .require_git(false)
            .build()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false));

        let mut files = Vec::new();
        for entry in walker {
            let path = entry.path();
            let Some(relative) = relative_path(&self.root, path) else {
                continue;
            };

            match std::fs::read(path) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(content) => files.push(FileEntry::new(relative, content)),
                    Err(_) => warn!(path = %relative, "Skipping non UTF-8 file"),
                },
                Err(e) => warn!(path = %relative, error = %e, "Skipping unreadable file"),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = %self.root.display(), files = files.len(), "Collected directory source");
        Ok(files)
    }
}

/// Forward-slash path of `path` under `root`
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
