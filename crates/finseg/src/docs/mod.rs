use crate::prelude::{println, *};
use colored::Colorize;
use finseg_core::catalog::{parse_catalog, DocumentInfo};
use finseg_core::library::{DocumentSource, MarkdownLibrary};
use finseg_core::pages::extract_page_range;
use finseg_core::search::{preview, search_segments, SegmentMatch};
use finseg_core::store::SegmentStore;
use finseg_core::{DocumentSegmentation, PageRange};
use serde::Serialize;

#[derive(Debug, clap::Parser)]
#[command(name = "docs")]
#[command(about = "Browse and search segmented documents")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// List documents in the library
    #[clap(name = "list")]
    List {
        /// Only list documents whose name contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the cached segmentation of a document
    #[clap(name = "segments")]
    Segments {
        /// Document name
        document: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search segment headings and descriptions
    #[clap(name = "search")]
    Search {
        /// Document name
        document: String,

        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,

        /// Maximum number of segments to return
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Characters of page content to include per segment
        #[arg(long, default_value = "500")]
        max_chars: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the text of a page range
    #[clap(name = "read")]
    Read {
        /// Document name
        document: String,

        /// First page
        start: u32,

        /// Last page
        end: u32,
    },

    /// Show catalog metadata for a document
    #[clap(name = "info")]
    Info {
        /// Document name
        document: String,
    },
}

#[derive(Debug, Serialize)]
pub struct DocumentListing {
    pub name: String,
    pub segmented: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub segment_match: SegmentMatch,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub doc_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_info: Option<DocumentInfo>,
    pub search_terms: Vec<String>,
    pub total_matches: usize,
    pub returned_segments: usize,
    pub segments: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
pub struct PageRangeOutput {
    pub doc_name: String,
    pub page_range: PageRange,
    pub content: String,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::List { filter, json } => {
            let listings = list_data(&global, filter.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&listings)?);
                return Ok(());
            }

            let mut table = new_table();
            table.add_row(prettytable::row!["Document", "Segmented"]);
            for listing in &listings {
                let segmented = if listing.segmented {
                    "yes".green()
                } else {
                    "no".yellow()
                };
                table.add_row(prettytable::row![listing.name, segmented]);
            }
            table.printstd();
            println!("\n{} documents", listings.len());
        }
        Commands::Segments { document, json } => {
            let segmentation = segments_data(&global, &document)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&segmentation)?);
                return Ok(());
            }

            println!(
                "{} ({} pages)\n",
                segmentation.document_name.bold(),
                segmentation.total_pages
            );
            let mut table = new_table();
            table.add_row(prettytable::row!["Pages", "Heading", "Description"]);
            for segment in &segmentation.segments {
                table.add_row(prettytable::row![
                    segment.page_range.to_string().cyan(),
                    segment.heading,
                    segment.description
                ]);
            }
            table.printstd();
        }
        Commands::Search {
            document,
            terms,
            limit,
            max_chars,
            json,
        } => {
            let output = search_document_data(&global, &document, &terms, limit, max_chars)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            println!(
                "{} of {} matching segments in {}\n",
                output.returned_segments, output.total_matches, output.doc_name
            );
            for (index, hit) in output.segments.iter().enumerate() {
                let segment = &hit.segment_match.segment;
                println!(
                    "{} {} (pages {}, score {:.2})",
                    format!("{}.", index + 1).green(),
                    segment.heading.bold(),
                    segment.page_range,
                    hit.segment_match.relevance_score
                );
                println!(
                    "   matched: {}",
                    hit.segment_match.matched_terms.join(", ")
                );
                if !hit.content.is_empty() {
                    println!("{}\n", hit.content);
                }
            }
        }
        Commands::Read {
            document,
            start,
            end,
        } => {
            let output = read_pages_data(&global, &document, start, end)?;
            println!("{}", output.content);
        }
        Commands::Info { document } => {
            let info = info_data(&global, &document)?
                .ok_or_else(|| eyre!("No catalog entry for {document}"))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

/// Library documents with their cache status. Public for MCP reuse.
pub fn list_data(global: &crate::Global, filter: Option<&str>) -> Result<Vec<DocumentListing>> {
    let library = MarkdownLibrary::new(global.markdown_dir());
    let store = SegmentStore::new(global.segments_dir());

    let names = library
        .list_documents(filter)
        .map_err(|e| eyre!("Failed to list {}: {}", library.dir().display(), e))?;

    Ok(names
        .into_iter()
        .map(|name| DocumentListing {
            segmented: store.contains(&name),
            name,
        })
        .collect())
}

pub fn segments_data(global: &crate::Global, document: &str) -> Result<DocumentSegmentation> {
    SegmentStore::new(global.segments_dir())
        .load(document)
        .ok_or_else(|| {
            eyre!(
                "No segmentation for {document}; run `finseg segment run {document}` first"
            )
        })
}

/// Rank segments by `terms` and attach the text of each hit's pages,
/// truncated to `max_chars`.
pub fn search_document_data(
    global: &crate::Global,
    document: &str,
    terms: &[String],
    max_segments: usize,
    max_chars: usize,
) -> Result<SearchOutput> {
    let segmentation = segments_data(global, document)?;
    let matches = search_segments(&segmentation, terms);
    let total_matches = matches.len();

    let library = MarkdownLibrary::new(global.markdown_dir());
    let text = if library.exists(document) {
        library.read(document).map_err(|e| eyre!(e))?
    } else {
        log::warn!("{document}: source markdown is missing, returning segments without content");
        String::new()
    };

    let segments: Vec<SearchHit> = matches
        .into_iter()
        .take(max_segments)
        .map(|segment_match| {
            let range = segment_match.segment.page_range;
            let content = extract_page_range(&text, range.start, range.end);
            SearchHit {
                content: preview(&content, max_chars),
                segment_match,
            }
        })
        .collect();

    Ok(SearchOutput {
        doc_name: document.to_string(),
        doc_info: info_data(global, document).unwrap_or_default(),
        search_terms: terms.to_vec(),
        total_matches,
        returned_segments: segments.len(),
        segments,
    })
}

/// Public function for MCP reuse
pub fn read_pages_data(
    global: &crate::Global,
    document: &str,
    start: u32,
    end: u32,
) -> Result<PageRangeOutput> {
    if start == 0 || start > end {
        return Err(eyre!("Invalid page range {start}-{end}"));
    }

    let library = MarkdownLibrary::new(global.markdown_dir());
    let text = library.read(document).map_err(|e| eyre!(e))?;

    Ok(PageRangeOutput {
        doc_name: document.to_string(),
        page_range: PageRange::new(start, end),
        content: extract_page_range(&text, start, end),
    })
}

/// Catalog entry for `document`, if the catalog lists it.
pub fn info_data(global: &crate::Global, document: &str) -> Result<Option<DocumentInfo>> {
    let path = global.catalog_path();
    let jsonl = std::fs::read_to_string(&path)
        .map_err(|e| eyre!("Failed to read catalog {}: {}", path.display(), e))?;
    let mut catalog = parse_catalog(&jsonl).map_err(|e| eyre!(e))?;
    Ok(catalog.remove(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use finseg_core::Segment;
    use tempfile::TempDir;

    fn global(dir: &TempDir) -> crate::Global {
        let global = crate::Global {
            data_dir: dir.path().to_path_buf(),
            catalog: None,
            verbose: false,
        };

        std::fs::create_dir_all(global.markdown_dir()).unwrap();
        std::fs::write(
            global.markdown_dir().join("ACME_2023_10K.md"),
            "<!-- Page 1 -->\nCover\n<!-- Page 2 -->\nRevenue grew 12%\n<!-- Page 3 -->\nRisks abound\n",
        )
        .unwrap();
        std::fs::write(
            global.catalog_path(),
            "{\"doc_name\": \"ACME_2023_10K\", \"company\": \"Acme\", \"doc_type\": \"10k\"}\n",
        )
        .unwrap();

        let segmentation = DocumentSegmentation::new(
            "ACME_2023_10K",
            3,
            vec![
                Segment::new("Cover", "Cover page", 1, 1),
                Segment::new("Financial Results", "Revenue and income", 2, 2),
                Segment::new("Risk Factors", "Risks to revenue", 3, 3),
            ],
        );
        SegmentStore::new(global.segments_dir())
            .store("ACME_2023_10K", &segmentation)
            .unwrap();

        global
    }

    #[test]
    fn test_list_reports_segmented_documents() {
        let dir = TempDir::new().unwrap();
        let global = global(&dir);
        std::fs::write(global.markdown_dir().join("OTHER_2022_10Q.md"), "").unwrap();

        let listings = list_data(&global, None).unwrap();
        let flags: Vec<(&str, bool)> = listings
            .iter()
            .map(|l| (l.name.as_str(), l.segmented))
            .collect();
        assert_eq!(
            flags,
            vec![("ACME_2023_10K", true), ("OTHER_2022_10Q", false)]
        );
    }

    #[test]
    fn test_search_attaches_page_content() {
        let dir = TempDir::new().unwrap();
        let global = global(&dir);

        let output =
            search_document_data(&global, "ACME_2023_10K", &["revenue".to_string()], 1, 500)
                .unwrap();

        assert_eq!(output.total_matches, 2);
        assert_eq!(output.returned_segments, 1);
        assert_eq!(
            output.segments[0].segment_match.segment.heading,
            "Financial Results"
        );
        let content = &output.segments[0].content;
        assert!(content.starts_with("<!-- Page 2 -->"));
        assert!(content.contains("Revenue grew 12%"));
        assert!(!content.contains("Risks abound"));
        assert_eq!(
            output.doc_info.unwrap().company.as_deref(),
            Some("Acme")
        );
    }

    #[test]
    fn test_read_pages() {
        let dir = TempDir::new().unwrap();
        let global = global(&dir);

        let output = read_pages_data(&global, "ACME_2023_10K", 2, 3).unwrap();
        assert!(output.content.contains("Revenue grew 12%"));
        assert!(output.content.contains("Risks abound"));
        assert!(!output.content.contains("Cover"));

        assert!(read_pages_data(&global, "ACME_2023_10K", 3, 2).is_err());
        assert!(read_pages_data(&global, "MISSING", 1, 1).is_err());
    }

    #[test]
    fn test_segments_require_cache() {
        let dir = TempDir::new().unwrap();
        let global = global(&dir);

        assert_eq!(segments_data(&global, "ACME_2023_10K").unwrap().segments.len(), 3);
        assert!(segments_data(&global, "OTHER_2022_10Q").is_err());
    }
}
