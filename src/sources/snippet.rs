use std::path::PathBuf;

use super::SourceProvider;
use crate::error::{DeployError, ErrorContext};
use crate::upload::FileEntry;

/// File name for a snippet whose language is declared by the code block
pub fn filename_for_language(language: &str) -> &'static str {
    match language.trim().to_ascii_lowercase().as_str() {
        "python" => "main.py",
        "javascript" => "index.js",
        _ => "index.html",
    }
}

/// Guess a file name from the snippet body when no language is known
pub fn detect_file_type(content: &str) -> &'static str {
    if content.contains("def ") || content.contains("import ") || content.contains("from ") {
        "main.py"
    } else if ["function ", "const ", "let ", "var "]
        .iter()
        .any(|kw| content.contains(kw))
    {
        "index.js"
    } else {
        "index.html"
    }
}

/// A single code block saved to a file
#[derive(Debug, Clone)]
pub struct SnippetSource {
    path: PathBuf,
    language: Option<String>,
}

impl SnippetSource {
    pub fn new(path: impl Into<PathBuf>, language: Option<String>) -> Self {
        Self {
            path: path.into(),
            language,
        }
    }

    /// Entry for in-memory snippet text
    pub fn entry_for(content: String, language: Option<&str>) -> FileEntry {
        let name = match language {
            Some(lang) => filename_for_language(lang),
            None => detect_file_type(&content),
        };
        FileEntry::new(name, content)
    }
}

impl SourceProvider for SnippetSource {
    fn name(&self) -> &str {
        "snippet"
    }

    fn get_files(&self) -> Result<Vec<FileEntry>, DeployError> {
        let content = std::fs::read_to_string(&self.path)
            .context(&format!("Failed to read {}", self.path.display()))?;
        Ok(vec![Self::entry_for(content, self.language.as_deref())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_language_mapping() {
        assert_eq!(filename_for_language("python"), "main.py");
        assert_eq!(filename_for_language("JavaScript"), "index.js");
        assert_eq!(filename_for_language("html"), "index.html");
        assert_eq!(filename_for_language("rust"), "index.html");
    }

    #[test]
    fn test_detect_file_type() {
        assert_eq!(detect_file_type("import os\nprint(os.name)"), "main.py");
        assert_eq!(detect_file_type("def main():\n    pass"), "main.py");
        assert_eq!(detect_file_type("const x = 1;"), "index.js");
        assert_eq!(detect_file_type("function go() {}"), "index.js");
        assert_eq!(detect_file_type("<html><body>hi</body></html>"), "index.html");
    }

    #[test]
    fn test_python_markers_checked_first() {
        // A script that imports and also declares a function stays Python
        assert_eq!(detect_file_type("from x import y\nfunction = 1"), "main.py");
    }

    #[test]
    fn test_snippet_file_with_language() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("block.txt");
        std::fs::write(&path, "console.log('hi')").unwrap();

        let files = SnippetSource::new(&path, Some("javascript".into()))
            .get_files()
            .unwrap();
        assert_eq!(files, vec![FileEntry::new("index.js", "console.log('hi')")]);

        let files = SnippetSource::new(&path, None).get_files().unwrap();
        assert_eq!(files[0].path, "index.html");
    }
}
