use crate::prelude::*;
use crate::segment::labeler::SegmentLabeler;
use crate::segment::pipeline::Segmenter;
use finseg_core::coverage::{
    format_page_ranges, verify_coverage, RetryDecision, RetryPolicy, SegmentationState,
};
use finseg_core::library::DocumentSource;
use finseg_core::PageRange;
use serde::Serialize;
use std::time::Instant;

/// How a document run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeState {
    /// Verified complete coverage.
    Success,
    /// Retry budget spent without complete coverage.
    Exhausted,
    /// The document could not be processed at all.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub document: String,
    pub state: OutcomeState,
    pub retries: u32,
    pub coverage_percent: f64,
    pub missing_pages: Vec<PageRange>,
    pub segments: usize,
    pub from_cache: bool,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every state the document passed through, in order.
    pub states: Vec<SegmentationState>,
}

impl DocumentOutcome {
    fn new(document: &str) -> Self {
        Self {
            document: document.to_string(),
            state: OutcomeState::Failed,
            retries: 0,
            coverage_percent: 0.0,
            missing_pages: Vec::new(),
            segments: 0,
            from_cache: false,
            elapsed_ms: 0,
            error: None,
            states: vec![SegmentationState::Pending],
        }
    }

    fn enter(&mut self, state: SegmentationState) {
        log::trace!("{}: {state}", self.document);
        self.states.push(state);
    }

    pub fn is_success(&self) -> bool {
        self.state == OutcomeState::Success
    }
}

/// Segment `document` until coverage verifies complete or `policy` runs out.
///
/// Every retry drops the cached entry and rebuilds from the source, so a
/// retry never re-reads the result it is retrying.
pub async fn segment_until_complete<L, S>(
    segmenter: &Segmenter<L, S>,
    document: &str,
    force: bool,
    policy: RetryPolicy,
) -> DocumentOutcome
where
    L: SegmentLabeler,
    S: DocumentSource,
{
    let started = Instant::now();
    let mut outcome = DocumentOutcome::new(document);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            outcome.enter(SegmentationState::Retrying);
            log::info!(
                "{document}: retry {attempt}/{} (coverage {:.1}%)",
                policy.max_retries,
                outcome.coverage_percent
            );

            if let Err(e) = segmenter.store().invalidate(document) {
                log::warn!("{document}: failed to invalidate cache: {e}");
            }
        }

        outcome.retries = attempt;

        match segmenter.segment_document(document, force || attempt > 0).await {
            Ok(segmented) => {
                outcome.enter(SegmentationState::Segmented);

                let report = verify_coverage(&segmented.segmentation);
                outcome.coverage_percent = report.coverage_percent;
                outcome.missing_pages = report.missing_pages.clone();
                outcome.segments = segmented.segmentation.segments.len();
                outcome.from_cache = segmented.from_cache;
                outcome.error = None;
                outcome.enter(SegmentationState::verified(&report));

                match policy.decide(&report, attempt) {
                    RetryDecision::Succeed => {
                        outcome.enter(SegmentationState::Success);
                        outcome.state = OutcomeState::Success;
                        break;
                    }
                    RetryDecision::Retry => {}
                    RetryDecision::Exhaust => {
                        outcome.enter(SegmentationState::Exhausted);
                        outcome.state = OutcomeState::Exhausted;
                        outcome.error = Some(format!(
                            "coverage {:.1}% after {attempt} retries, missing pages {}",
                            report.coverage_percent,
                            format_page_ranges(&report.missing_pages)
                        ));
                        break;
                    }
                }
            }
            Err(e @ Error::DocumentNotFound(_)) => {
                log::error!("{e}");
                outcome.state = OutcomeState::Failed;
                outcome.error = Some(e.to_string());
                break;
            }
            Err(e) => {
                log::warn!("{document}: attempt {attempt} failed: {e}");
                outcome.error = Some(e.to_string());

                if !policy.allows_retry(attempt) {
                    outcome.enter(SegmentationState::Exhausted);
                    outcome.state = OutcomeState::Exhausted;
                    break;
                }
            }
        }

        attempt += 1;
    }

    outcome.elapsed_ms = started.elapsed().as_millis() as u64;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::labeler::{HeadingLabeler, LabelError};
    use crate::segment::pipeline::tests::{document, MemorySource};
    use crate::segment::pipeline::SegmenterConfig;
    use finseg_core::chunk::Chunk;
    use finseg_core::store::SegmentStore;
    use finseg_core::Segment;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;
    use SegmentationState::*;

    /// Returns nothing for the first `empty_calls` calls, then one segment
    /// covering the chunk.
    struct FlakyLabeler {
        empty_calls: u32,
        calls: AtomicU32,
    }

    impl FlakyLabeler {
        fn new(empty_calls: u32) -> Self {
            Self {
                empty_calls,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl SegmentLabeler for FlakyLabeler {
        async fn label(&self, chunk: &Chunk) -> Result<Vec<Segment>, LabelError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.empty_calls {
                return Ok(Vec::new());
            }
            Ok(vec![Segment::new(
                "Whole chunk",
                "",
                chunk.start_page,
                chunk.end_page,
            )])
        }
    }

    fn segmenter<L: SegmentLabeler>(
        labeler: L,
        dir: &TempDir,
        text: &str,
    ) -> Segmenter<L, MemorySource> {
        Segmenter::new(
            labeler,
            MemorySource::with("ACME_2023_10K", text),
            SegmentStore::new(dir.path()),
            SegmenterConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_retry_converges_within_budget() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(FlakyLabeler::new(1), &dir, &document(10));

        let outcome =
            segment_until_complete(&segmenter, "ACME_2023_10K", false, RetryPolicy::new(1)).await;

        assert_eq!(outcome.state, OutcomeState::Success);
        assert_eq!(outcome.retries, 1);
        assert_eq!(outcome.coverage_percent, 100.0);
        assert!(outcome.error.is_none());
        assert_eq!(
            outcome.states,
            vec![
                Pending,
                Segmented,
                VerifiedPartial,
                Retrying,
                Segmented,
                VerifiedComplete,
                Success
            ]
        );
    }

    #[tokio::test]
    async fn test_retry_exhausted_with_zero_budget() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(FlakyLabeler::new(1), &dir, &document(10));

        let outcome =
            segment_until_complete(&segmenter, "ACME_2023_10K", false, RetryPolicy::new(0)).await;

        assert_eq!(outcome.state, OutcomeState::Exhausted);
        assert_eq!(outcome.retries, 0);
        assert_eq!(outcome.coverage_percent, 0.0);
        assert_eq!(outcome.missing_pages, vec![PageRange::new(1, 10)]);
        assert!(outcome.error.as_deref().unwrap().ends_with("missing pages 1-10"));
        assert_eq!(
            outcome.states,
            vec![Pending, Segmented, VerifiedPartial, Exhausted]
        );
    }

    #[tokio::test]
    async fn test_retry_ignores_partial_cache() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(FlakyLabeler::new(1), &dir, &document(10));

        // The first attempt caches an empty segmentation.
        segment_until_complete(&segmenter, "ACME_2023_10K", false, RetryPolicy::new(0)).await;

        let outcome =
            segment_until_complete(&segmenter, "ACME_2023_10K", false, RetryPolicy::new(1)).await;
        assert_eq!(outcome.state, OutcomeState::Success);
        assert_eq!(outcome.retries, 1);
        assert!(!outcome.from_cache);
    }

    #[tokio::test]
    async fn test_cached_complete_segmentation_succeeds_immediately() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(HeadingLabeler, &dir, &document(10));

        segment_until_complete(&segmenter, "ACME_2023_10K", false, RetryPolicy::new(3)).await;
        let outcome =
            segment_until_complete(&segmenter, "ACME_2023_10K", false, RetryPolicy::new(3)).await;

        assert!(outcome.is_success());
        assert!(outcome.from_cache);
        assert_eq!(outcome.retries, 0);
    }

    #[tokio::test]
    async fn test_empty_document_is_complete() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(FlakyLabeler::new(0), &dir, "");

        let outcome =
            segment_until_complete(&segmenter, "ACME_2023_10K", false, RetryPolicy::new(3)).await;

        assert_eq!(outcome.state, OutcomeState::Success);
        assert_eq!(outcome.segments, 0);
        assert_eq!(outcome.coverage_percent, 100.0);
    }

    #[tokio::test]
    async fn test_missing_document_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(HeadingLabeler, &dir, &document(3));

        let outcome =
            segment_until_complete(&segmenter, "OTHER_2023_10K", false, RetryPolicy::new(3)).await;

        assert_eq!(outcome.state, OutcomeState::Failed);
        assert_eq!(outcome.retries, 0);
        assert_eq!(outcome.states, vec![Pending]);
        assert!(outcome.error.unwrap().contains("OTHER_2023_10K"));
    }
}
