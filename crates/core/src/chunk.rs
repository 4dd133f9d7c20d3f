//! Fixed-size page windows, one per labeling call
//!
//! Windows are cut purely by position in the page sequence. A section may
//! straddle two chunks; reconciliation repairs that later.

use crate::pages::Page;
use serde::Serialize;

/// A window of consecutive pages sent to the labeler in a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position of this window in the chunk sequence.
    pub index: usize,
    /// Pages rendered with explicit `[PG:N]` tags.
    pub text: String,
    /// Page number (not position) of the first page.
    pub start_page: u32,
    /// Page number (not position) of the last page.
    pub end_page: u32,
    pub page_count: usize,
}

/// Tag placed in front of every page so the labeler can cite exact pages.
pub fn page_tag(page_number: u32) -> String {
    format!("### Page Number: [PG:{page_number}]")
}

/// Render pages as chunk text.
pub fn render_chunk_text(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|page| format!("{}\n{}\n\n", page_tag(page.page_number), page.content))
        .collect()
}

/// Split pages into `ceil(len / size)` non-overlapping windows.
///
/// A `size` of zero is treated as one page per chunk.
pub fn chunk_pages(pages: &[Page], size: usize) -> Vec<Chunk> {
    let size = size.max(1);

    pages
        .chunks(size)
        .enumerate()
        .filter_map(|(index, window)| {
            let first = window.first()?;
            let last = window.last()?;
            Some(Chunk {
                index,
                text: render_chunk_text(window),
                start_page: first.page_number,
                end_page: last.page_number,
                page_count: window.len(),
            })
        })
        .collect()
}
