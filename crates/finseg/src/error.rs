#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Failed to read document {0}: {1}")]
    SourceRead(String, String),

    #[error("Cache error: {0}")]
    Cache(String),
}
