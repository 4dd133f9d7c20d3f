use crate::prelude::*;
use crate::segment::labeler::SegmentLabeler;
use finseg_core::chunk::{chunk_pages, Chunk};
use finseg_core::fallback::fallback_segments;
use finseg_core::library::{DocumentSource, LibraryError};
use finseg_core::pages::parse_pages;
use finseg_core::reconcile::reconcile;
use finseg_core::store::SegmentStore;
use finseg_core::{DocumentSegmentation, Segment};
use futures::stream::{self, StreamExt};
use std::time::Duration;

/// Tuning for a single document run.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Pages per labeling call.
    pub chunk_size: usize,
    /// Concurrent labeling calls per document.
    pub chunk_workers: usize,
    /// Upper bound on a single labeling call.
    pub label_timeout: Duration,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 60,
            chunk_workers: 5,
            label_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Segmented {
    pub segmentation: DocumentSegmentation,
    pub from_cache: bool,
}

/// Turns one document into a stored, reconciled segmentation.
pub struct Segmenter<L, S> {
    labeler: L,
    source: S,
    store: SegmentStore,
    config: SegmenterConfig,
}

impl<L: SegmentLabeler, S: DocumentSource> Segmenter<L, S> {
    pub fn new(labeler: L, source: S, store: SegmentStore, config: SegmenterConfig) -> Self {
        Self {
            labeler,
            source,
            store,
            config,
        }
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    /// Segment `document`, serving the cached result unless `force` is set.
    ///
    /// Labeling failures never fail the document: the affected chunk is
    /// segmented from its headings instead.
    pub async fn segment_document(&self, document: &str, force: bool) -> Result<Segmented, Error> {
        if !force {
            if let Some(segmentation) = self.store.load(document) {
                log::debug!("{document}: using cached segmentation");
                return Ok(Segmented {
                    segmentation,
                    from_cache: true,
                });
            }

            if self.store.contains(document) {
                log::warn!("{document}: cached segmentation is unreadable, rebuilding");
            }
        }

        if !self.source.exists(document) {
            return Err(Error::DocumentNotFound(document.to_string()));
        }

        let text = self.source.read(document).map_err(|e| match e {
            LibraryError::NotFound(name) => Error::DocumentNotFound(name),
            other => Error::SourceRead(document.to_string(), other.to_string()),
        })?;

        let parsed = parse_pages(&text);
        log::info!("{document}: found {} pages", parsed.total_pages);

        let segments = if parsed.is_empty() {
            Vec::new()
        } else {
            let chunks = chunk_pages(&parsed.pages, self.config.chunk_size);
            log::debug!("{document}: labeling {} chunks", chunks.len());

            let candidates = self.label_chunks(document, &chunks).await;
            reconcile(candidates, parsed.total_pages)
        };

        let segmentation = DocumentSegmentation::new(document, parsed.total_pages, segments);

        self.store
            .store(document, &segmentation)
            .map_err(|e| Error::Cache(e.to_string()))?;

        log::info!(
            "{document}: stored {} segments",
            segmentation.segments.len()
        );

        Ok(Segmented {
            segmentation,
            from_cache: false,
        })
    }

    /// Label all chunks with bounded concurrency and concatenate the
    /// candidates in chunk order.
    async fn label_chunks(&self, document: &str, chunks: &[Chunk]) -> Vec<Segment> {
        let workers = self.config.chunk_workers.clamp(1, chunks.len().max(1));

        let mut labeled: Vec<(usize, Vec<Segment>)> = stream::iter(chunks)
            .map(|chunk| async move { (chunk.index, self.label_chunk(document, chunk).await) })
            .buffer_unordered(workers)
            .collect()
            .await;

        labeled.sort_by_key(|(index, _)| *index);
        labeled.into_iter().flat_map(|(_, segments)| segments).collect()
    }

    async fn label_chunk(&self, document: &str, chunk: &Chunk) -> Vec<Segment> {
        match tokio::time::timeout(self.config.label_timeout, self.labeler.label(chunk)).await {
            Ok(Ok(segments)) => segments,
            Ok(Err(e)) => {
                log::warn!(
                    "{document}: chunk {} (pages {}-{}): {e}; using headings",
                    chunk.index,
                    chunk.start_page,
                    chunk.end_page
                );
                fallback_segments(&chunk.text, chunk.start_page, chunk.end_page)
            }
            Err(_) => {
                log::warn!(
                    "{document}: chunk {} (pages {}-{}) timed out after {:?}; using headings",
                    chunk.index,
                    chunk.start_page,
                    chunk.end_page,
                    self.config.label_timeout
                );
                fallback_segments(&chunk.text, chunk.start_page, chunk.end_page)
            }
        }
    }
}
