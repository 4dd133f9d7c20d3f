//! Coverage verification and retry policy
//!
//! Verification recomputes coverage from the segment ranges alone. It does
//! not rely on anything the reconciler reported, so it also catches
//! segmentations that were damaged or hand-edited in the cache.

use crate::segment::{DocumentSegmentation, PageRange};
use serde::{Deserialize, Serialize};

/// Result of checking one segmentation against `1..=total_pages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub total_pages: u32,
    /// Pages claimed by exactly one segment, as a percentage of `total_pages`.
    pub coverage_percent: f64,
    /// Pages no segment claims, as maximal inclusive ranges.
    pub missing_pages: Vec<PageRange>,
    /// Pages claimed by more than one segment, as maximal inclusive ranges.
    pub overlapping_pages: Vec<PageRange>,
    /// Parts of segment ranges that fall outside the document.
    pub out_of_bounds: Vec<PageRange>,
    /// Ranges with `start > end`.
    pub malformed: Vec<PageRange>,
    /// Segments are not strictly increasing by start page.
    pub unsorted: bool,
}

impl CoverageReport {
    /// Every page claimed exactly once, nothing outside the document, in order.
    pub fn is_complete(&self) -> bool {
        self.missing_pages.is_empty()
            && self.overlapping_pages.is_empty()
            && self.out_of_bounds.is_empty()
            && self.malformed.is_empty()
            && !self.unsorted
    }

    pub fn missing_page_count(&self) -> u64 {
        self.missing_pages.iter().map(|r| u64::from(r.len())).sum()
    }
}

/// Render ranges as `1-3, 7-7`.
pub fn format_page_ranges(ranges: &[PageRange]) -> String {
    ranges
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append `start..=end` to `ranges`, extending the last range when adjacent.
fn push_range(ranges: &mut Vec<PageRange>, start: u64, end: u64) {
    // Bounded by `total_pages`, so both fit in a u32.
    let (start, end) = (start as u32, end as u32);
    match ranges.last_mut() {
        Some(last) if u64::from(last.end) + 1 == u64::from(start) => last.end = end,
        _ => ranges.push(PageRange::new(start, end)),
    }
}

/// Verify that a segmentation is a sorted partition of `1..=total_pages`.
///
/// Runs in time and memory proportional to the number of segments, never
/// the number of pages. An empty document is vacuously complete.
pub fn verify_coverage(segmentation: &DocumentSegmentation) -> CoverageReport {
    let total = segmentation.total_pages;
    let mut out_of_bounds = Vec::new();
    let mut malformed = Vec::new();

    // Depth changes along the page axis: +1 where a claim starts, -1 one
    // page past where it ends.
    let mut events: Vec<(u64, i64)> = Vec::with_capacity(segmentation.segments.len() * 2 + 1);

    for segment in &segmentation.segments {
        let range = segment.page_range;
        if !range.is_valid() {
            malformed.push(range);
            continue;
        }

        if range.start == 0 {
            out_of_bounds.push(PageRange::new(0, 0));
        }
        if range.end > total {
            out_of_bounds.push(PageRange::new(range.start.max(total + 1), range.end));
        }

        let start = range.start.max(1);
        let end = range.end.min(total);
        if start <= end {
            events.push((u64::from(start), 1));
            events.push((u64::from(end) + 1, -1));
        }
    }

    let sentinel = u64::from(total) + 1;
    events.push((sentinel, 0));
    events.sort_unstable();

    let mut missing_pages = Vec::new();
    let mut overlapping_pages = Vec::new();
    let mut exactly_once = 0u64;
    let mut depth = 0i64;
    let mut cursor = 1u64;

    for (at, delta) in events {
        if at > cursor {
            let last = at - 1;
            match depth {
                0 => push_range(&mut missing_pages, cursor, last),
                1 => exactly_once += last - cursor + 1,
                _ => push_range(&mut overlapping_pages, cursor, last),
            }
            cursor = at;
        }
        depth += delta;
    }

    let coverage_percent = if total == 0 {
        100.0
    } else {
        exactly_once as f64 / f64::from(total) * 100.0
    };

    let unsorted = segmentation
        .segments
        .windows(2)
        .any(|pair| pair[0].page_range.start >= pair[1].page_range.start);

    CoverageReport {
        total_pages: total,
        coverage_percent,
        missing_pages,
        overlapping_pages,
        out_of_bounds,
        malformed,
        unsorted,
    }
}

/// Lifecycle of one document through segmentation and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationState {
    Pending,
    Segmented,
    VerifiedComplete,
    VerifiedPartial,
    Retrying,
    Success,
    Exhausted,
}

impl SegmentationState {
    /// State reached after verifying a freshly segmented document.
    pub fn verified(report: &CoverageReport) -> Self {
        if report.is_complete() {
            SegmentationState::VerifiedComplete
        } else {
            SegmentationState::VerifiedPartial
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SegmentationState::Success | SegmentationState::Exhausted
        )
    }
}

impl std::fmt::Display for SegmentationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SegmentationState::Pending => "pending",
            SegmentationState::Segmented => "segmented",
            SegmentationState::VerifiedComplete => "verified_complete",
            SegmentationState::VerifiedPartial => "verified_partial",
            SegmentationState::Retrying => "retrying",
            SegmentationState::Success => "success",
            SegmentationState::Exhausted => "exhausted",
        };
        write!(f, "{name}")
    }
}

/// What to do after verifying attempt number `attempt` (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Succeed,
    Retry,
    Exhaust,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn decide(&self, report: &CoverageReport, attempt: u32) -> RetryDecision {
        if report.is_complete() {
            RetryDecision::Succeed
        } else if attempt < self.max_retries {
            RetryDecision::Retry
        } else {
            RetryDecision::Exhaust
        }
    }

    /// Whether another attempt is allowed after a failed attempt `attempt`.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}
