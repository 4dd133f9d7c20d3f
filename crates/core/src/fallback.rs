//! Rule-based segmentation used when the remote labeler is unavailable or fails.
//!
//! The output always covers the chunk's page span exactly once.

use crate::segment::Segment;
use regex::Regex;
use std::sync::OnceLock;

fn heading_line() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| Regex::new(r"(?m)^#+\s+(.+)$").unwrap())
}

fn page_tag_line() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"^Page Number: \[PG:\d+\]$").unwrap())
}

/// Heading texts in document order, skipping the chunker's own page tags.
pub fn find_headings(text: &str) -> Vec<String> {
    heading_line()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|heading| !heading.is_empty() && !page_tag_line().is_match(heading))
        .collect()
}

/// Single segment used when a chunk carries no recognizable heading.
pub fn untitled_segment(start_page: u32, end_page: u32) -> Segment {
    Segment::new(
        format!("Document Section (Pages {start_page}-{end_page})"),
        "Document content without clear section headers",
        start_page,
        end_page,
    )
}

/// Split `start_page..=end_page` evenly across the headings found in `text`.
///
/// Each heading gets `span / headings` pages in the order found and the last
/// one absorbs the remainder. When there are more headings than pages only
/// the first `span` headings are used, one page each.
pub fn fallback_segments(text: &str, start_page: u32, end_page: u32) -> Vec<Segment> {
    let (start, end) = (start_page.min(end_page), start_page.max(end_page));
    let span = (end - start + 1) as usize;

    let mut headings = find_headings(text);
    if headings.is_empty() {
        return vec![untitled_segment(start, end)];
    }
    headings.truncate(span);

    let count = headings.len();
    let pages_per_heading = (span / count) as u32;

    headings
        .into_iter()
        .enumerate()
        .map(|(i, heading)| {
            let seg_start = start + i as u32 * pages_per_heading;
            let seg_end = if i + 1 == count {
                end
            } else {
                seg_start + pages_per_heading - 1
            };
            let description = format!("Section containing {heading}");
            Segment::new(heading, description, seg_start, seg_end)
        })
        .collect()
}
