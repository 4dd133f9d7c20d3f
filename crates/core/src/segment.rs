//! Segmentation data model
//!
//! These types are also the on-disk cache format. The JSON shape
//! (`document_name`, `total_pages`, `segments[].{heading, description, page_range}`)
//! is read by the retrieval tools, so field names must not change.

use serde::{Deserialize, Serialize};

/// Inclusive page interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A range is well formed when `start <= end`.
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Number of pages in the range, zero for a malformed range.
    pub fn len(&self) -> u32 {
        if self.is_valid() {
            self.end - self.start + 1
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, page: u32) -> bool {
        self.start <= page && page <= self.end
    }

    pub fn intersects(&self, other: &PageRange) -> bool {
        self.end >= other.start && other.end >= self.start
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A labeled, contiguous page range within one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub heading: String,
    pub description: String,
    pub page_range: PageRange,
}

impl Segment {
    pub fn new(
        heading: impl Into<String>,
        description: impl Into<String>,
        start: u32,
        end: u32,
    ) -> Self {
        Self {
            heading: heading.into(),
            description: description.into(),
            page_range: PageRange::new(start, end),
        }
    }

    pub fn start(&self) -> u32 {
        self.page_range.start
    }

    pub fn end(&self) -> u32 {
        self.page_range.end
    }
}

/// Complete segmentation of one document, the unit of cache storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSegmentation {
    pub document_name: String,
    pub total_pages: u32,
    pub segments: Vec<Segment>,
}

impl DocumentSegmentation {
    pub fn new(document_name: impl Into<String>, total_pages: u32, segments: Vec<Segment>) -> Self {
        Self {
            document_name: document_name.into(),
            total_pages,
            segments,
        }
    }

    /// Empty segmentation for a document without any content.
    pub fn empty(document_name: impl Into<String>) -> Self {
        Self::new(document_name, 0, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_range_len_and_validity() {
        assert_eq!(PageRange::new(3, 5).len(), 3);
        assert_eq!(PageRange::new(4, 4).len(), 1);
        assert_eq!(PageRange::new(5, 3).len(), 0);
        assert!(!PageRange::new(5, 3).is_valid());
    }

    #[test]
    fn test_page_range_intersects() {
        let a = PageRange::new(1, 5);
        assert!(a.intersects(&PageRange::new(5, 8)));
        assert!(a.intersects(&PageRange::new(2, 3)));
        assert!(!a.intersects(&PageRange::new(6, 9)));
        assert!(PageRange::new(6, 9).intersects(&PageRange::new(1, 6)));
    }

    #[test]
    fn test_segmentation_json_shape() {
        let seg = DocumentSegmentation::new(
            "3M_2018_10K",
            2,
            vec![Segment::new("Risk Factors", "Risks", 1, 2)],
        );

        let value = serde_json::to_value(&seg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "document_name": "3M_2018_10K",
                "total_pages": 2,
                "segments": [{
                    "heading": "Risk Factors",
                    "description": "Risks",
                    "page_range": { "start": 1, "end": 2 }
                }]
            })
        );
    }
}
