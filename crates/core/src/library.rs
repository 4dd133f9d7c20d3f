//! Markdown document library
//!
//! Paginated markdown produced by the OCR step lives in one directory, one
//! `<document_name>.md` file per filing.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Invalid document name: {0}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Provider of paginated markdown text per document name.
pub trait DocumentSource {
    fn exists(&self, name: &str) -> bool;
    fn read(&self, name: &str) -> Result<String, LibraryError>;
}

/// Validate a document name before using it as part of a file name.
///
/// Names must be non-empty, must not start with a dot, and may only contain
/// alphanumeric characters, hyphens, underscores and dots.
pub fn validate_document_name(name: &str) -> Result<(), LibraryError> {
    if name.is_empty() {
        return Err(LibraryError::InvalidName(
            "Document name cannot be empty".to_string(),
        ));
    }

    if name.starts_with('.') {
        return Err(LibraryError::InvalidName(format!(
            "{name}: document names cannot start with a dot"
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(LibraryError::InvalidName(format!(
            "{name}: only alphanumeric characters, hyphens, underscores and dots are allowed"
        )));
    }

    Ok(())
}

/// Directory of `<name>.md` files.
#[derive(Debug, Clone)]
pub struct MarkdownLibrary {
    dir: PathBuf,
}

impl MarkdownLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.md"))
    }

    /// List document names, sorted, optionally keeping only names that
    /// contain `filter` (case-insensitive).
    pub fn list_documents(&self, filter: Option<&str>) -> Result<Vec<String>, LibraryError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let filter = filter.map(str::to_lowercase);
        let mut documents = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();

            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }

            if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                let keep = filter
                    .as_deref()
                    .map_or(true, |f| name.to_lowercase().contains(f));
                if keep {
                    documents.push(name.to_string());
                }
            }
        }

        documents.sort();
        Ok(documents)
    }
}

impl DocumentSource for MarkdownLibrary {
    fn exists(&self, name: &str) -> bool {
        validate_document_name(name).is_ok() && self.path_for(name).is_file()
    }

    fn read(&self, name: &str) -> Result<String, LibraryError> {
        validate_document_name(name)?;

        let path = self.path_for(name);
        if !path.is_file() {
            return Err(LibraryError::NotFound(name.to_string()));
        }

        Ok(fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_and_exists() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("3M_2018_10K.md"), "<!-- Page 1 -->hi").unwrap();

        let library = MarkdownLibrary::new(temp_dir.path());
        assert!(library.exists("3M_2018_10K"));
        assert!(!library.exists("PEPSICO_2022_10K"));
        assert_eq!(library.read("3M_2018_10K").unwrap(), "<!-- Page 1 -->hi");
        assert!(matches!(
            library.read("PEPSICO_2022_10K"),
            Err(LibraryError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_documents_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["BOEING_2022_10K.md", "3M_2018_10K.md", "3M_2023Q2_10Q.md", "notes.txt"] {
            fs::write(temp_dir.path().join(name), "x").unwrap();
        }

        let library = MarkdownLibrary::new(temp_dir.path());
        assert_eq!(
            library.list_documents(None).unwrap(),
            vec!["3M_2018_10K", "3M_2023Q2_10Q", "BOEING_2022_10K"]
        );
        assert_eq!(
            library.list_documents(Some("10q")).unwrap(),
            vec!["3M_2023Q2_10Q"]
        );
    }

    #[test]
    fn test_list_nonexistent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let library = MarkdownLibrary::new(temp_dir.path().join("missing"));
        assert_eq!(library.list_documents(None).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_validate_document_name() {
        assert!(validate_document_name("AMCOR_2023Q2_10Q").is_ok());
        assert!(validate_document_name("jpm-2021.annual").is_ok());
        assert!(validate_document_name("").is_err());
        assert!(validate_document_name("../etc/passwd").is_err());
        assert!(validate_document_name(".hidden").is_err());
        assert!(validate_document_name("a/b").is_err());
    }
}
