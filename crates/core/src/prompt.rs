//! Prompt construction and response parsing for the remote labeler.

use crate::chunk::Chunk;
use crate::segment::Segment;
use serde::Deserialize;
use thiserror::Error;

pub const SEGMENTATION_PREAMBLE: &str = "\
You are a financial document analysis expert specializing in SEC filings (10-K, 10-Q, 8-K forms).
Your task is to segment financial documents into logical sections based on standard SEC filing structure.

Focus on identifying major sections such as:
- Business Overview/Description
- Risk Factors
- Legal Proceedings
- Management's Discussion and Analysis (MD&A)
- Financial Statements (Income Statement, Balance Sheet, Cash Flows)
- Notes to Financial Statements
- Controls and Procedures
- Executive Compensation
- Corporate Governance

Rules:
- Provide accurate page ranges using the [PG:X] markers.
- Ensure complete coverage of all pages with no gaps.
- Create meaningful section titles and descriptions.
- Output ONLY a JSON array. No markdown fences. No commentary.
- Each element must have the shape:
  {\"heading\": string, \"description\": string, \"page_range\": {\"start\": integer, \"end\": integer}}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Empty response")]
    Empty,
    #[error("No JSON found in response")]
    NoJson,
    #[error("Malformed segment list: {0}")]
    Malformed(String),
}

/// Build the user prompt for one chunk.
pub fn build_segmentation_prompt(chunk: &Chunk) -> String {
    let (start, end) = (chunk.start_page, chunk.end_page);
    format!(
        "Segment this financial document section covering pages {start} to {end}.

CRITICAL REQUIREMENTS:
- Account for EVERY SINGLE page from {start} to {end} with NO GAPS
- Use CONSECUTIVE page ranges that cover ALL pages
- DO NOT create overlapping segments - each page should belong to only ONE segment
- Extract page numbers from \"### Page Number: [PG:X]\" markers
- Create segments that together cover pages {start} through {end} completely
- If a page has minimal content, include it in the nearest logical section

<Document>
{text}
</Document>",
        text = chunk.text
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentResponse {
    List(Vec<Segment>),
    Wrapped { segments: Vec<Segment> },
}

/// Strip code fences and surrounding commentary, leaving the JSON payload.
fn extract_json(response: &str) -> Option<&str> {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    text = text.trim();
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim();
    }

    let start = text.find(['[', '{'])?;
    let end = text.rfind([']', '}'])?;
    (start <= end).then(|| &text[start..=end])
}

/// Parse the labeler's answer into candidate segments.
///
/// Accepts a bare JSON array or an object with a `segments` array, optionally
/// wrapped in code fences or commentary. Page ranges are not checked here;
/// reconciliation deals with bad ranges.
pub fn parse_segment_response(response: &str) -> Result<Vec<Segment>, ResponseError> {
    if response.trim().is_empty() {
        return Err(ResponseError::Empty);
    }

    let json = extract_json(response).ok_or(ResponseError::NoJson)?;

    match serde_json::from_str::<SegmentResponse>(json) {
        Ok(SegmentResponse::List(segments)) | Ok(SegmentResponse::Wrapped { segments }) => {
            Ok(segments)
        }
        Err(e) => Err(ResponseError::Malformed(e.to_string())),
    }
}
