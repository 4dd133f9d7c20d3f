//! Document metadata catalog (one JSON object per line).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid catalog entry on line {line}: {message}")]
    InvalidEntry { line: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub doc_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gics_sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_period: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_link: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Parse a JSONL catalog keyed by `doc_name`. Blank lines are skipped.
pub fn parse_catalog(jsonl: &str) -> Result<BTreeMap<String, DocumentInfo>, CatalogError> {
    let mut catalog = BTreeMap::new();

    for (i, line) in jsonl.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let info: DocumentInfo =
            serde_json::from_str(line).map_err(|e| CatalogError::InvalidEntry {
                line: i + 1,
                message: e.to_string(),
            })?;
        catalog.insert(info.doc_name.clone(), info);
    }

    Ok(catalog)
}
