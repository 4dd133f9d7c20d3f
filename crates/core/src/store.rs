//! Segmentation cache storage
//!
//! One pretty-printed JSON file per document, `<name>_segments.json`. An entry
//! that cannot be read or deserialized counts as absent; callers rebuild it
//! from scratch rather than patching it.

use crate::library::{validate_document_name, LibraryError};
use crate::segment::DocumentSegmentation;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SUFFIX: &str = "_segments.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidName(#[from] LibraryError),
}

#[derive(Debug, Clone)]
pub struct SegmentStore {
    dir: PathBuf,
}

impl SegmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, document: &str) -> PathBuf {
        self.dir.join(format!("{document}{SUFFIX}"))
    }

    /// Load a cached segmentation. Missing or corrupt entries return `None`.
    pub fn load(&self, document: &str) -> Option<DocumentSegmentation> {
        validate_document_name(document).ok()?;
        let content = fs::read_to_string(self.path_for(document)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether an entry file exists, regardless of whether it parses.
    pub fn contains(&self, document: &str) -> bool {
        validate_document_name(document).is_ok() && self.path_for(document).is_file()
    }

    pub fn store(
        &self,
        document: &str,
        segmentation: &DocumentSegmentation,
    ) -> Result<(), StoreError> {
        validate_document_name(document)?;
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(segmentation)?;
        fs::write(self.path_for(document), json)?;
        Ok(())
    }

    /// Remove a cached entry. Removing an absent entry is not an error.
    pub fn invalidate(&self, document: &str) -> Result<(), StoreError> {
        validate_document_name(document)?;

        match fs::remove_file(self.path_for(document)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of all cached documents, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(SUFFIX))
            {
                documents.push(name.to_string());
            }
        }

        documents.sort();
        Ok(documents)
    }
}
