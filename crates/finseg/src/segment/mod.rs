pub mod batch;
pub mod labeler;
pub mod pipeline;
pub mod retry;

use crate::prelude::{eprintln, println, *};
use batch::{print_summary, progress_bar, run_batch, BatchOptions};
use colored::Colorize;
use finseg_core::coverage::{format_page_ranges, verify_coverage};
use finseg_core::library::MarkdownLibrary;
use finseg_core::store::SegmentStore;
use labeler::{Labeler, LabelerConfig};
use pipeline::{Segmenter, SegmenterConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, clap::Parser)]
#[command(name = "segment")]
#[command(about = "Segment documents into page-covering sections")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Segment documents, retrying until every page is covered
    #[clap(name = "run")]
    Run(RunOptions),

    /// Re-verify the cached segmentation of a document
    #[clap(name = "coverage")]
    Coverage(CoverageOptions),
}

#[derive(Debug, clap::Args, Clone)]
pub struct RunOptions {
    /// Documents to segment (defaults to every document in the library)
    documents: Vec<String>,

    /// Only segment documents whose name contains this text
    #[arg(long)]
    filter: Option<String>,

    /// Documents processed concurrently
    #[arg(long, env = "FINSEG_WORKERS", default_value = "3")]
    workers: usize,

    /// Labeling calls in flight per document
    #[arg(long, env = "FINSEG_CHUNK_WORKERS", default_value = "5")]
    chunk_workers: usize,

    /// Pages per labeling call
    #[arg(long, env = "FINSEG_CHUNK_SIZE", default_value = "60")]
    chunk_size: usize,

    /// Ignore cached segmentations
    #[arg(long)]
    force: bool,

    /// Retries allowed per document when coverage is incomplete
    #[arg(long, env = "FINSEG_MAX_RETRIES", default_value = "3")]
    max_retries: u32,

    /// Segment from markdown headings only, without calling a model
    #[arg(long)]
    offline: bool,

    /// Seconds before a labeling call falls back to headings
    #[arg(long, env = "FINSEG_LABEL_TIMEOUT", default_value = "120")]
    label_timeout: u64,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Model used to label chunks
    #[arg(long, env = "FINSEG_MODEL", default_value = "qwen2.5:14b")]
    model: String,

    /// Write the full JSON report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl RunOptions {
    fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            chunk_size: self.chunk_size,
            chunk_workers: self.chunk_workers,
            label_timeout: Duration::from_secs(self.label_timeout),
        }
    }

    fn labeler_config(&self) -> LabelerConfig {
        LabelerConfig {
            base_url: self.ollama_url.clone(),
            model: self.model.clone(),
        }
    }

    fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            document_workers: self.workers,
            max_retries: self.max_retries,
            force: self.force,
        }
    }
}

#[derive(Debug, clap::Args, Clone)]
pub struct CoverageOptions {
    /// Document name
    document: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Run(options) => run_segmentation(options, global).await,
        Commands::Coverage(options) => coverage(options, global),
    }
}

async fn run_segmentation(options: RunOptions, global: crate::Global) -> Result<()> {
    let library = MarkdownLibrary::new(global.markdown_dir());

    let documents = if options.documents.is_empty() {
        library
            .list_documents(options.filter.as_deref())
            .map_err(|e| eyre!("Failed to list {}: {}", library.dir().display(), e))?
    } else {
        options.documents.clone()
    };

    if documents.is_empty() {
        eprintln!(
            "No markdown documents found in {}",
            library.dir().display()
        );
        return Ok(());
    }

    let labeler = Labeler::from_config(&options.labeler_config(), options.offline);

    if global.verbose {
        eprintln!(
            "Segmenting {} documents with the {} labeler (chunk size {}, {} document workers)",
            documents.len(),
            labeler.name(),
            options.chunk_size,
            options.workers
        );
    }

    let segmenter = Segmenter::new(
        labeler,
        library,
        SegmentStore::new(global.segments_dir()),
        options.segmenter_config(),
    );

    let progress = progress_bar(documents.len(), options.json);
    let report = run_batch(
        &segmenter,
        documents,
        &options.batch_options(),
        &progress,
    )
    .await;
    progress.finish_and_clear();

    if let Some(path) = &options.report {
        report.write(path)?;
        if global.verbose {
            eprintln!("Report written to {}", path.display());
        }
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn coverage(options: CoverageOptions, global: crate::Global) -> Result<()> {
    let store = SegmentStore::new(global.segments_dir());
    let segmentation = store
        .load(&options.document)
        .ok_or_else(|| eyre!("No cached segmentation for {}", options.document))?;

    let report = verify_coverage(&segmentation);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Pages", "Heading"]);
    for segment in &segmentation.segments {
        table.add_row(prettytable::row![
            segment.page_range.to_string().cyan(),
            segment.heading
        ]);
    }
    table.printstd();

    let status = if report.is_complete() {
        "complete".green()
    } else {
        "incomplete".red()
    };

    println!(
        "\n{}: {} pages, {:.1}% coverage ({})",
        segmentation.document_name,
        report.total_pages,
        report.coverage_percent,
        status
    );

    if !report.missing_pages.is_empty() {
        println!(
            "Missing pages ({}): {}",
            report.missing_page_count(),
            format_page_ranges(&report.missing_pages)
        );
    }
    if !report.overlapping_pages.is_empty() {
        println!(
            "Overlapping pages: {}",
            format_page_ranges(&report.overlapping_pages)
        );
    }
    if !report.out_of_bounds.is_empty() || !report.malformed.is_empty() {
        println!(
            "Invalid ranges: {} out of bounds, {} malformed",
            report.out_of_bounds.len(),
            report.malformed.len()
        );
    }
    if report.unsorted {
        println!("Segments are not in page order");
    }

    Ok(())
}
