//! Page parsing for OCR'd markdown
//!
//! The OCR step writes one `<!-- Page N -->` comment in front of every page.
//! Parsing keeps the number carried by each marker instead of counting, so
//! repeated or out-of-order markers reach the caller as data.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One page of a paginated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page_number: u32,
    pub content: String,
}

/// Result of splitting a document into pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Non-blank pages in marker order.
    pub pages: Vec<Page>,
    /// Highest page number seen in any marker, including pages dropped for
    /// being blank. Zero when the document has no content at all.
    pub total_pages: u32,
}

impl ParsedDocument {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn page_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"<!--\s*Page\s+(\d+)\s*-->").unwrap())
}

/// Split markers into `(page_number, content)` pairs, blank pages included.
///
/// Page numbers are 1-based; a `Page 0` marker is read as page 1 so its
/// content still counts toward the document.
fn split_on_markers(text: &str) -> Vec<(u32, &str)> {
    let markers: Vec<(u32, usize, usize)> = page_marker()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse::<u32>().ok()?;
            Some((number.max(1), whole.start(), whole.end()))
        })
        .collect();

    markers
        .iter()
        .enumerate()
        .map(|(i, &(number, _, content_start))| {
            let content_end = markers
                .get(i + 1)
                .map(|&(_, next_start, _)| next_start)
                .unwrap_or(text.len());
            (number, &text[content_start..content_end])
        })
        .collect()
}

/// Parse a paginated markdown document into pages.
///
/// Text before the first marker is ignored. Without any marker the whole
/// document becomes page 1.
pub fn parse_pages(text: &str) -> ParsedDocument {
    let raw = split_on_markers(text);

    if raw.is_empty() {
        let content = text.trim();
        if content.is_empty() {
            return ParsedDocument {
                pages: Vec::new(),
                total_pages: 0,
            };
        }
        return ParsedDocument {
            pages: vec![Page {
                page_number: 1,
                content: content.to_string(),
            }],
            total_pages: 1,
        };
    }

    let pages: Vec<Page> = raw
        .iter()
        .filter_map(|&(page_number, content)| {
            let content = content.trim();
            (!content.is_empty()).then(|| Page {
                page_number,
                content: content.to_string(),
            })
        })
        .collect();

    if pages.is_empty() {
        return ParsedDocument {
            pages,
            total_pages: 0,
        };
    }

    let total_pages = raw.iter().map(|&(number, _)| number).max().unwrap_or(0);

    ParsedDocument { pages, total_pages }
}

/// Extract the raw text of pages `start..=end`, markers included.
///
/// Stops at the first marker past `end`.
pub fn extract_page_range(text: &str, start: u32, end: u32) -> String {
    let mut extracted = Vec::new();

    for (page_number, content) in split_on_markers(text) {
        if page_number > end {
            break;
        }
        if page_number >= start {
            extracted.push(format!("<!-- Page {page_number} -->"));
            extracted.push(content.to_string());
        }
    }

    extracted.join("\n")
}
