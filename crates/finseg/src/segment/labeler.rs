use crate::prelude::*;
use finseg_core::chunk::Chunk;
use finseg_core::fallback::fallback_segments;
use finseg_core::prompt::{
    build_segmentation_prompt, parse_segment_response, ResponseError, SEGMENTATION_PREAMBLE,
};
use finseg_core::Segment;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::ollama;
use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Labeler request failed: {0}")]
    Request(String),

    #[error("Malformed labeler response: {0}")]
    Malformed(#[from] ResponseError),
}

/// Labels one chunk with candidate segments.
///
/// Implementations are not trusted to cover the chunk, stay inside it, or
/// avoid overlaps; the pipeline reconciles whatever comes back.
pub trait SegmentLabeler {
    fn label(&self, chunk: &Chunk) -> impl Future<Output = Result<Vec<Segment>, LabelError>>;
}

/// Connection settings for the remote labeler.
#[derive(Debug, Clone)]
pub struct LabelerConfig {
    pub base_url: String,
    pub model: String,
}

fn create_client(base_url: &str) -> Result<ollama::Client> {
    use rig::client::Nothing;

    ollama::Client::builder()
        .api_key(Nothing)
        .base_url(base_url)
        .build()
        .map_err(|e| eyre!("Failed to create Ollama client: {}", e))
}

/// Model-backed labeler.
pub struct RemoteLabeler {
    client: ollama::Client,
    model: String,
}

impl RemoteLabeler {
    pub fn new(config: &LabelerConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(&config.base_url)?,
            model: config.model.clone(),
        })
    }
}

impl SegmentLabeler for RemoteLabeler {
    async fn label(&self, chunk: &Chunk) -> Result<Vec<Segment>, LabelError> {
        let prompt = build_segmentation_prompt(chunk);

        let agent = self
            .client
            .agent(&self.model)
            .preamble(SEGMENTATION_PREAMBLE)
            .build();

        let response = agent
            .prompt(&prompt)
            .await
            .map_err(|e| LabelError::Request(e.to_string()))?;

        Ok(parse_segment_response(&response)?)
    }
}

/// Rule-based labeler splitting each chunk across its markdown headings.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingLabeler;

impl SegmentLabeler for HeadingLabeler {
    async fn label(&self, chunk: &Chunk) -> Result<Vec<Segment>, LabelError> {
        Ok(fallback_segments(
            &chunk.text,
            chunk.start_page,
            chunk.end_page,
        ))
    }
}

pub enum Labeler {
    Remote(RemoteLabeler),
    Heading(HeadingLabeler),
}

impl Labeler {
    /// Remote labeler unless `offline`, falling back to headings when the
    /// client cannot be created.
    pub fn from_config(config: &LabelerConfig, offline: bool) -> Self {
        if offline {
            return Labeler::Heading(HeadingLabeler);
        }

        match RemoteLabeler::new(config) {
            Ok(remote) => {
                log::info!(
                    "Using remote labeler {} at {}",
                    config.model,
                    config.base_url
                );
                Labeler::Remote(remote)
            }
            Err(e) => {
                log::warn!("{e}; falling back to heading-based segmentation");
                Labeler::Heading(HeadingLabeler)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Labeler::Remote(_) => "remote",
            Labeler::Heading(_) => "heading",
        }
    }
}

impl SegmentLabeler for Labeler {
    async fn label(&self, chunk: &Chunk) -> Result<Vec<Segment>, LabelError> {
        match self {
            Labeler::Remote(labeler) => labeler.label(chunk).await,
            Labeler::Heading(labeler) => labeler.label(chunk).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finseg_core::chunk::chunk_pages;
    use finseg_core::pages::parse_pages;

    #[tokio::test]
    async fn test_heading_labeler_covers_chunk() {
        let parsed = parse_pages(
            "<!-- Page 1 -->\n# Item 1. Business\n<!-- Page 2 -->\ntext\n<!-- Page 3 -->\n# Item 1A. Risk Factors\n",
        );
        let chunks = chunk_pages(&parsed.pages, 60);

        let segments = HeadingLabeler.label(&chunks[0]).await.unwrap();
        let ranges: Vec<(u32, u32)> = segments
            .iter()
            .map(|s| (s.page_range.start, s.page_range.end))
            .collect();
        assert_eq!(ranges, vec![(1, 1), (2, 3)]);
        assert_eq!(segments[0].heading, "Item 1. Business");
    }

    #[test]
    fn test_offline_selects_heading_labeler() {
        let config = LabelerConfig {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
        };
        assert_eq!(Labeler::from_config(&config, true).name(), "heading");
    }
}
