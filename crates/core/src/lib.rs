//! Core library for finseg
//!
//! This crate implements the **Functional Core** of the finseg application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`finseg_core`** (this crate): page parsing, chunking, reconciliation,
//!   coverage verification and retrieval ranking, all as plain functions over
//!   owned data. The only I/O is local file access in [`store`] and [`library`].
//! - **`finseg`**: the labeler calls, concurrency, retries, CLI and MCP server
//!   (the Imperative Shell).
//!
//! # Segmentation flow
//!
//! ```text
//! markdown ─▶ pages::parse_pages ─▶ chunk::chunk_pages ─▶ (labeler, per chunk)
//!          ─▶ reconcile::reconcile ─▶ store::SegmentStore ─▶ coverage::verify_coverage
//! ```
//!
//! The labeler is untrusted. Whatever it returns, [`reconcile::reconcile`]
//! turns the candidates into a sorted, disjoint partition of
//! `1..=total_pages`, and [`coverage::verify_coverage`] checks the result
//! again from scratch.
//!
//! # Example Usage
//!
//! ```rust
//! use finseg_core::{chunk, fallback, pages, reconcile, coverage, DocumentSegmentation};
//!
//! let text = "<!-- Page 1 -->\n# Cover\n<!-- Page 2 -->\n# Risk Factors\nBody";
//! let parsed = pages::parse_pages(text);
//!
//! let candidates: Vec<_> = chunk::chunk_pages(&parsed.pages, 60)
//!     .iter()
//!     .flat_map(|c| fallback::fallback_segments(&c.text, c.start_page, c.end_page))
//!     .collect();
//!
//! let segments = reconcile::reconcile(candidates, parsed.total_pages);
//! let segmentation = DocumentSegmentation::new("DEMO", parsed.total_pages, segments);
//! assert!(coverage::verify_coverage(&segmentation).is_complete());
//! ```

pub mod catalog;
pub mod chunk;
pub mod coverage;
pub mod fallback;
pub mod library;
pub mod pages;
pub mod prompt;
pub mod reconcile;
pub mod search;
pub mod segment;
pub mod store;

pub use segment::{DocumentSegmentation, PageRange, Segment};
