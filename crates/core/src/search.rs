//! Segment search for the retrieval tools
//!
//! Matching is plain case-insensitive substring search over headings and
//! descriptions, ranked by the fraction of search terms a segment matched.

use crate::segment::{DocumentSegmentation, Segment};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentMatch {
    #[serde(flatten)]
    pub segment: Segment,
    pub matched_terms: Vec<String>,
    pub relevance_score: f64,
}

/// Rank segments by how many of `terms` appear in their heading or description.
///
/// Segments matching no term are omitted. Equal scores keep document order.
pub fn search_segments(segmentation: &DocumentSegmentation, terms: &[String]) -> Vec<SegmentMatch> {
    let terms: Vec<String> = terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if terms.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<SegmentMatch> = segmentation
        .segments
        .iter()
        .filter_map(|segment| {
            let heading = segment.heading.to_lowercase();
            let description = segment.description.to_lowercase();

            let matched_terms: Vec<String> = terms
                .iter()
                .filter(|t| heading.contains(t.as_str()) || description.contains(t.as_str()))
                .cloned()
                .collect();

            if matched_terms.is_empty() {
                return None;
            }

            let relevance_score = matched_terms.len() as f64 / terms.len() as f64;
            Some(SegmentMatch {
                segment: segment.clone(),
                matched_terms,
                relevance_score,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    matches
}

/// Truncate `content` to `max_chars` characters, appending `...` when cut.
pub fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }

    let mut truncated: String = content.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
