//! Coverage reconciliation
//!
//! Labeler output is noisy in three ways: repeated ranges, overlapping ranges
//! (mostly near chunk edges, since chunking ignores content) and missing
//! ranges (blank or boilerplate pages the labeler skipped). [`reconcile`]
//! repairs all three deterministically and never drops a page of the source
//! document, producing a sorted, disjoint partition of `1..=total_pages`.
//!
//! Steps, in order:
//!
//! 0. Normalize: drop malformed ranges (`start > end`), clip to
//!    `1..=total_pages`, drop ranges entirely out of bounds.
//! 1. Sort by start page.
//! 2. Drop exact `(start, end, heading)` duplicates, keeping the first.
//! 3. Resolve overlaps between neighbours until none remain (see
//!    [`resolve_overlaps`]).
//! 4. Sort again.
//! 5. Fill gaps between segments with filler sections.
//! 6. Fill the front and tail of the document.

use crate::segment::{PageRange, Segment};
use std::collections::HashSet;

pub const GAP_DESCRIPTION: &str = "Additional document content";
pub const HEADER_HEADING: &str = "Document Header (Cover, TOC, etc.)";
pub const HEADER_DESCRIPTION: &str =
    "Document header pages including cover page and table of contents";
pub const APPENDIX_HEADING: &str = "Document Appendix";
pub const APPENDIX_DESCRIPTION: &str = "Additional document content and appendices";

/// Filler for pages between two labeled segments.
pub fn gap_filler(start: u32, end: u32) -> Segment {
    Segment::new(
        format!("Document Section (Pages {start}-{end})"),
        GAP_DESCRIPTION,
        start,
        end,
    )
}

/// Filler for pages before the first labeled segment.
pub fn header_filler(end: u32) -> Segment {
    Segment::new(HEADER_HEADING, HEADER_DESCRIPTION, 1, end)
}

/// Filler for pages after the last labeled segment.
pub fn appendix_filler(start: u32, total_pages: u32) -> Segment {
    Segment::new(APPENDIX_HEADING, APPENDIX_DESCRIPTION, start, total_pages)
}

/// Repair raw candidate segments into a page partition of `1..=total_pages`.
///
/// `candidates` is the concatenation of every chunk's labeler output in chunk
/// order. An empty candidate list yields an empty result: there is nothing to
/// anchor a partition on, and the coverage check downstream reports the
/// document as incomplete.
pub fn reconcile(candidates: Vec<Segment>, total_pages: u32) -> Vec<Segment> {
    if total_pages == 0 {
        return Vec::new();
    }

    let mut segments = normalize(candidates, total_pages);
    if segments.is_empty() {
        return Vec::new();
    }

    sort_by_start(&mut segments);
    let segments = dedup_exact(segments);
    let mut segments = resolve_overlaps(segments);
    sort_by_start(&mut segments);
    let segments = fill_gaps(segments);
    fill_boundaries(segments, total_pages)
}

fn sort_by_start(segments: &mut [Segment]) {
    segments.sort_by_key(|s| (s.page_range.start, s.page_range.end));
}

fn normalize(candidates: Vec<Segment>, total_pages: u32) -> Vec<Segment> {
    candidates
        .into_iter()
        .filter(|s| s.page_range.is_valid())
        .filter_map(|mut s| {
            let start = s.page_range.start.max(1);
            let end = s.page_range.end.min(total_pages);
            if start > end {
                return None;
            }
            s.page_range = PageRange::new(start, end);
            Some(s)
        })
        .collect()
}

fn dedup_exact(segments: Vec<Segment>) -> Vec<Segment> {
    let mut seen = HashSet::new();
    segments
        .into_iter()
        .filter(|s| seen.insert((s.page_range.start, s.page_range.end, s.heading.clone())))
        .collect()
}

/// Pick the longer of two texts, keeping `current` on a tie.
fn longer(current: String, other: String) -> String {
    if current.chars().count() >= other.chars().count() {
        current
    } else {
        other
    }
}

/// Fuse two intersecting segments into their union.
fn fuse(current: Segment, next: Segment) -> Segment {
    let range = PageRange::new(
        current.page_range.start.min(next.page_range.start),
        current.page_range.end.max(next.page_range.end),
    );
    Segment {
        heading: longer(current.heading, next.heading),
        description: longer(current.description, next.description),
        page_range: range,
    }
}

/// Resolve overlaps until no segment intersects its successor.
///
/// Two cases:
///
/// - Boundary hand-off: `next` starts on `current`'s last page and runs past
///   it. The shared page stays with `current` and `next` starts one page
///   later. Section transitions that share a page are the common case here.
/// - Anything else is fused into one segment spanning both ranges; for both
///   heading and description the longer text wins.
///
/// The list is re-sorted and re-scanned after every change so chains like
/// A overlaps B overlaps C resolve fully.
pub fn resolve_overlaps(mut segments: Vec<Segment>) -> Vec<Segment> {
    sort_by_start(&mut segments);

    let mut i = 0;
    while i + 1 < segments.len() {
        let current = segments[i].page_range;
        let next = segments[i + 1].page_range;

        if !current.intersects(&next) {
            i += 1;
            continue;
        }

        if next.start == current.end && next.end > current.end {
            segments[i + 1].page_range.start = current.end + 1;
        } else {
            let next = segments.remove(i + 1);
            let current = segments.remove(i);
            segments.insert(i, fuse(current, next));
        }

        sort_by_start(&mut segments);
        i = i.saturating_sub(1);
    }

    segments
}

fn fill_gaps(segments: Vec<Segment>) -> Vec<Segment> {
    let mut filled = Vec::with_capacity(segments.len());
    let mut iter = segments.into_iter().peekable();

    while let Some(segment) = iter.next() {
        let end = segment.page_range.end;
        filled.push(segment);

        if let Some(next) = iter.peek() {
            let next_start = next.page_range.start;
            if end + 1 < next_start {
                filled.push(gap_filler(end + 1, next_start - 1));
            }
        }
    }

    filled
}

fn fill_boundaries(mut segments: Vec<Segment>, total_pages: u32) -> Vec<Segment> {
    let (Some(first_start), Some(last_end)) = (
        segments.first().map(|s| s.page_range.start),
        segments.last().map(|s| s.page_range.end),
    ) else {
        return segments;
    };

    if first_start > 1 {
        segments.insert(0, header_filler(first_start - 1));
    }

    if last_end < total_pages {
        segments.push(appendix_filler(last_end + 1, total_pages));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::verify_coverage;
    use crate::segment::DocumentSegmentation;

    fn seg(heading: &str, start: u32, end: u32) -> Segment {
        Segment::new(heading, format!("{heading} description"), start, end)
    }

    fn ranges(segments: &[Segment]) -> Vec<(u32, u32)> {
        segments
            .iter()
            .map(|s| (s.page_range.start, s.page_range.end))
            .collect()
    }

    /// Partition laws: sorted, strictly increasing, disjoint, and covering.
    fn assert_partition(segments: &[Segment], total_pages: u32) {
        let mut expected = 1;
        for s in segments {
            assert!(s.page_range.is_valid(), "malformed range {}", s.page_range);
            assert_eq!(s.page_range.start, expected, "gap or overlap at {}", s.page_range);
            expected = s.page_range.end + 1;
        }
        assert_eq!(expected, total_pages + 1, "coverage does not reach the last page");
    }

    #[test]
    fn test_merge_fixture() {
        let candidates = vec![seg("A", 1, 5), seg("BB", 3, 8), seg("C", 8, 10)];
        let result = reconcile(candidates, 10);

        assert_eq!(ranges(&result), vec![(1, 8), (9, 10)]);
        assert_eq!(result[0].heading, "BB");
        assert_eq!(result[1].heading, "C");
        assert_partition(&result, 10);
    }

    #[test]
    fn test_gap_fill_fixture() {
        let candidates = vec![seg("X", 3, 5), seg("Y", 8, 10)];
        let result = reconcile(candidates, 10);

        assert_eq!(ranges(&result), vec![(1, 2), (3, 5), (6, 7), (8, 10)]);
        assert_eq!(result[0].heading, HEADER_HEADING);
        assert_eq!(result[1].heading, "X");
        assert_eq!(result[2].heading, "Document Section (Pages 6-7)");
        assert_eq!(result[2].description, GAP_DESCRIPTION);
        assert_eq!(result[3].heading, "Y");
    }

    #[test]
    fn test_appendix_fill() {
        let result = reconcile(vec![seg("Body", 1, 4)], 9);
        assert_eq!(ranges(&result), vec![(1, 4), (5, 9)]);
        assert_eq!(result[1].heading, APPENDIX_HEADING);
    }

    #[test]
    fn test_exact_duplicates_keep_first() {
        let mut first = seg("Risk Factors", 1, 4);
        first.description = "first".to_string();
        let mut second = seg("Risk Factors", 1, 4);
        second.description = "a much longer second description".to_string();

        let result = reconcile(vec![first, second], 4);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].description, "first");
    }

    #[test]
    fn test_nested_ranges_fuse() {
        let result = reconcile(vec![seg("Outer", 1, 10), seg("Inner section", 3, 4)], 10);
        assert_eq!(ranges(&result), vec![(1, 10)]);
        assert_eq!(result[0].heading, "Inner section");
    }

    #[test]
    fn test_fusion_tie_keeps_current_text() {
        let result = reconcile(vec![seg("AAA", 1, 5), seg("BBB", 2, 6)], 6);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].heading, "AAA");
    }

    #[test]
    fn test_transitive_overlap_chain() {
        let candidates = vec![
            seg("one", 1, 4),
            seg("two", 3, 7),
            seg("three", 6, 9),
            seg("four", 8, 12),
        ];
        let result = reconcile(candidates, 12);
        assert_eq!(ranges(&result), vec![(1, 12)]);
    }

    #[test]
    fn test_boundary_handoff_with_same_start_candidates() {
        let candidates = vec![seg("X", 1, 8), seg("C", 8, 10), seg("D", 8, 9)];
        let result = reconcile(candidates, 10);
        assert_partition(&result, 10);
        assert_eq!(result[0].heading, "X");
    }

    #[test]
    fn test_single_page_touching_previous_end_is_absorbed() {
        let result = reconcile(vec![seg("Long heading", 1, 5), seg("B", 5, 5)], 5);
        assert_eq!(ranges(&result), vec![(1, 5)]);
        assert_eq!(result[0].heading, "Long heading");
    }

    #[test]
    fn test_out_of_bounds_and_malformed_candidates() {
        let candidates = vec![
            seg("malformed", 6, 2),
            seg("beyond", 40, 50),
            seg("clipped", 3, 99),
            seg("zero", 0, 1),
        ];
        let result = reconcile(candidates, 10);
        assert_eq!(ranges(&result), vec![(1, 1), (2, 2), (3, 10)]);
        assert_eq!(result[0].heading, "zero");
        assert_eq!(result[2].heading, "clipped");
    }

    #[test]
    fn test_unsorted_chunk_output() {
        let candidates = vec![seg("late", 7, 10), seg("early", 1, 3), seg("middle", 4, 6)];
        let result = reconcile(candidates, 10);
        assert_eq!(
            result.iter().map(|s| s.heading.as_str()).collect::<Vec<_>>(),
            vec!["early", "middle", "late"]
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reconcile(Vec::new(), 10).is_empty());
        assert!(reconcile(vec![seg("A", 1, 3)], 0).is_empty());
        assert!(reconcile(vec![seg("gone", 20, 30)], 10).is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let candidates = vec![
            seg("A", 2, 5),
            seg("BB", 4, 9),
            seg("C", 9, 12),
            seg("D", 15, 18),
            seg("D", 15, 18),
        ];
        let once = reconcile(candidates, 20);
        let twice = reconcile(once.clone(), 20);
        assert_eq!(once, twice);
        assert_partition(&once, 20);
    }

    #[test]
    fn test_noisy_chunks_always_partition() {
        // Mimic chunks of 5 pages whose labels overlap chunk edges, repeat
        // ranges, and skip pages entirely.
        let total_pages = 23;
        let mut candidates = Vec::new();
        for chunk_start in (1..=total_pages).step_by(5) {
            let chunk_end = (chunk_start + 4).min(total_pages);
            candidates.push(seg("head", chunk_start, chunk_start + 1));
            candidates.push(seg("head", chunk_start, chunk_start + 1));
            if chunk_end > chunk_start + 2 {
                candidates.push(seg("tail section", chunk_start + 3, chunk_end + 1));
            }
        }

        let result = reconcile(candidates, total_pages);
        assert_partition(&result, total_pages);
    }

    fn noisy_candidates() -> impl proptest::strategy::Strategy<Value = Vec<Segment>> {
        use proptest::prelude::*;

        // Ranges may be inverted or run past the document; headings repeat
        // often enough to produce exact duplicates.
        prop::collection::vec((0u32..=40, 0u32..=40, "[A-C]{1,3}"), 0..12).prop_map(|raw| {
            raw.into_iter()
                .map(|(start, end, heading)| seg(&heading, start, end))
                .collect()
        })
    }

    #[test]
    fn test_reconcile_partitions_any_anchored_input() {
        use proptest::prelude::*;

        proptest!(ProptestConfig::with_cases(512), |(total_pages in 1u32..=30, candidates in noisy_candidates())| {
            let anchored = candidates.iter().any(|s| {
                s.page_range.is_valid()
                    && s.page_range.start.max(1) <= s.page_range.end.min(total_pages)
            });

            let result = reconcile(candidates, total_pages);
            prop_assert_eq!(result.is_empty(), !anchored);

            if anchored {
                prop_assert_eq!(result[0].page_range.start, 1);
                prop_assert_eq!(result[result.len() - 1].page_range.end, total_pages);
                for pair in result.windows(2) {
                    prop_assert!(pair[0].page_range.is_valid());
                    prop_assert_eq!(pair[0].page_range.end + 1, pair[1].page_range.start);
                }

                let report = verify_coverage(&DocumentSegmentation::new("DOC", total_pages, result));
                prop_assert!(report.is_complete());
            }
        });
    }

    #[test]
    fn test_reconcile_is_idempotent_on_any_input() {
        use proptest::prelude::*;

        proptest!(ProptestConfig::with_cases(512), |(total_pages in 0u32..=30, candidates in noisy_candidates())| {
            let once = reconcile(candidates, total_pages);
            let twice = reconcile(once.clone(), total_pages);
            prop_assert_eq!(once, twice);
        });
    }
}
