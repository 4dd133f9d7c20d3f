use crate::prelude::{println, *};
use crate::segment::labeler::SegmentLabeler;
use crate::segment::pipeline::Segmenter;
use crate::segment::retry::{segment_until_complete, DocumentOutcome, OutcomeState};
use colored::Colorize;
use finseg_core::coverage::RetryPolicy;
use finseg_core::library::DocumentSource;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Batch-level settings.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Documents processed concurrently.
    pub document_workers: usize,
    pub max_retries: u32,
    /// Ignore cached segmentations on the first attempt.
    pub force: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            document_workers: 3,
            max_retries: 3,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total_documents: usize,
    pub completed: usize,
    pub skipped_cached: usize,
    pub failed: usize,
    pub retried: usize,
    pub total_segments: usize,
    pub failed_documents: Vec<String>,
    pub retry_documents: Vec<String>,
}

impl BatchSummary {
    fn record(&mut self, outcome: &DocumentOutcome) {
        if outcome.retries > 0 {
            self.retried += 1;
            self.retry_documents.push(outcome.document.clone());
        }

        match outcome.state {
            OutcomeState::Success => {
                self.completed += 1;
                self.total_segments += outcome.segments;
                if outcome.from_cache {
                    self.skipped_cached += 1;
                }
            }
            OutcomeState::Exhausted | OutcomeState::Failed => {
                self.failed += 1;
                self.failed_documents.push(outcome.document.clone());
            }
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_documents == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total_documents as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: String,
    pub summary: BatchSummary,
    pub results: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| eyre!("Failed to write report to {}: {}", path.display(), e))
    }
}

pub fn progress_bar(len: usize, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    pb
}

/// Segment every document in `documents`, `document_workers` at a time.
///
/// Duplicate names are processed once. Counts are kept by this function
/// alone as outcomes arrive, so workers share nothing mutable.
pub async fn run_batch<L, S>(
    segmenter: &Segmenter<L, S>,
    documents: Vec<String>,
    options: &BatchOptions,
    progress: &ProgressBar,
) -> BatchReport
where
    L: SegmentLabeler,
    S: DocumentSource,
{
    let documents: Vec<String> = documents
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let policy = RetryPolicy::new(options.max_retries);
    let workers = options.document_workers.max(1);

    let mut summary = BatchSummary {
        total_documents: documents.len(),
        ..Default::default()
    };
    let mut results = Vec::with_capacity(documents.len());

    log::info!(
        "Segmenting {} documents with {workers} workers",
        documents.len()
    );

    let mut outcomes = stream::iter(&documents)
        .map(|document| segment_until_complete(segmenter, document, options.force, policy))
        .buffer_unordered(workers);

    while let Some(outcome) = outcomes.next().await {
        match outcome.state {
            OutcomeState::Success => log::info!(
                "{}: {} segments, {:.1}% coverage in {}ms",
                outcome.document,
                outcome.segments,
                outcome.coverage_percent,
                outcome.elapsed_ms
            ),
            _ => log::error!(
                "{}: {}",
                outcome.document,
                outcome.error.as_deref().unwrap_or("failed")
            ),
        }

        summary.record(&outcome);
        progress.inc(1);
        progress.set_message(outcome.document.clone());
        results.push(outcome);
    }

    results.sort_by(|a, b| a.document.cmp(&b.document));

    BatchReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary,
        results,
    }
}

pub fn print_summary(report: &BatchReport) {
    let summary = &report.summary;

    let mut table = new_table();
    table.add_row(prettytable::row!["Documents", summary.total_documents]);
    table.add_row(prettytable::row![
        "Completed",
        summary.completed.to_string().green()
    ]);
    table.add_row(prettytable::row!["From cache", summary.skipped_cached]);
    table.add_row(prettytable::row![
        "Retried",
        summary.retried.to_string().yellow()
    ]);
    let failed = if summary.failed > 0 {
        summary.failed.to_string().red()
    } else {
        summary.failed.to_string().normal()
    };
    table.add_row(prettytable::row!["Failed", failed]);
    table.add_row(prettytable::row!["Segments", summary.total_segments]);
    table.add_row(prettytable::row![
        "Success rate",
        format!("{:.1}%", summary.success_rate())
    ]);
    table.printstd();

    if !summary.failed_documents.is_empty() {
        println!("\n{}", "Failed documents:".red().bold());
        for outcome in report.results.iter().filter(|o| !o.is_success()) {
            println!(
                "  {} ({:.1}% coverage): {}",
                outcome.document,
                outcome.coverage_percent,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::labeler::HeadingLabeler;
    use crate::segment::pipeline::tests::{document, MemorySource};
    use crate::segment::pipeline::SegmenterConfig;
    use finseg_core::store::SegmentStore;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn segmenter(dir: &TempDir) -> Segmenter<HeadingLabeler, MemorySource> {
        let mut docs = HashMap::new();
        docs.insert("ACME_2022_10K".to_string(), document(9));
        docs.insert("ACME_2023_10K".to_string(), document(14));
        docs.insert("EMPTY_2023_10Q".to_string(), String::new());

        Segmenter::new(
            HeadingLabeler,
            MemorySource(docs),
            SegmentStore::new(dir.path()),
            SegmenterConfig {
                chunk_size: 4,
                ..SegmenterConfig::default()
            },
        )
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_counts_outcomes() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(&dir);

        let report = run_batch(
            &segmenter,
            names(&["ACME_2023_10K", "ACME_2022_10K", "EMPTY_2023_10Q", "MISSING"]),
            &BatchOptions::default(),
            &ProgressBar::hidden(),
        )
        .await;

        let summary = &report.summary;
        assert_eq!(summary.total_documents, 4);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failed_documents, vec!["MISSING".to_string()]);
        assert_eq!(summary.skipped_cached, 0);
        assert_eq!(summary.retried, 0);

        let documents: Vec<&str> = report.results.iter().map(|o| o.document.as_str()).collect();
        assert_eq!(
            documents,
            vec!["ACME_2022_10K", "ACME_2023_10K", "EMPTY_2023_10Q", "MISSING"]
        );
    }

    #[tokio::test]
    async fn test_batch_deduplicates_and_uses_cache() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(&dir);
        let options = BatchOptions {
            document_workers: 2,
            ..BatchOptions::default()
        };

        run_batch(
            &segmenter,
            names(&["ACME_2023_10K"]),
            &options,
            &ProgressBar::hidden(),
        )
        .await;

        let report = run_batch(
            &segmenter,
            names(&["ACME_2023_10K", "ACME_2023_10K", "ACME_2022_10K"]),
            &options,
            &ProgressBar::hidden(),
        )
        .await;

        assert_eq!(report.summary.total_documents, 2);
        assert_eq!(report.summary.completed, 2);
        assert_eq!(report.summary.skipped_cached, 1);
    }

    #[tokio::test]
    async fn test_report_written_as_json() {
        let dir = TempDir::new().unwrap();
        let segmenter = segmenter(&dir);
        let report = run_batch(
            &segmenter,
            names(&["ACME_2022_10K"]),
            &BatchOptions::default(),
            &ProgressBar::hidden(),
        )
        .await;

        let path = dir.path().join("report.json");
        report.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["completed"], 1);
        assert_eq!(value["results"][0]["state"], "success");
        assert!(value["generated_at"].is_string());
    }
}
