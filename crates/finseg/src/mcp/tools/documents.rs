use super::{CallToolResult, Content, JsonRpcError};
use crate::docs;
use serde::Deserialize;

const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

const DEFAULT_MAX_SEGMENTS: usize = 5;
const DEFAULT_MAX_CHARS: usize = 500;

fn parse_args<T: serde::de::DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments.unwrap_or(serde_json::Value::Null)).map_err(|e| JsonRpcError {
        code: INVALID_PARAMS,
        message: format!("Invalid arguments: {e}"),
        data: None,
    })
}

fn internal_err(message: String) -> JsonRpcError {
    JsonRpcError {
        code: INTERNAL_ERROR,
        message,
        data: None,
    }
}

fn to_text_result(value: &impl serde::Serialize) -> Result<serde_json::Value, JsonRpcError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| internal_err(format!("Serialization error: {e}")))?;

    serde_json::to_value(CallToolResult {
        content: vec![Content::Text { text: json }],
        is_error: None,
    })
    .map_err(|e| internal_err(format!("Internal error: {e}")))
}

/// Run file-bound work off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, JsonRpcError>
where
    T: Send + 'static,
    F: FnOnce() -> color_eyre::eyre::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| internal_err(format!("Task join error: {e}")))?
        .map_err(|e| internal_err(e.to_string()))
}

#[derive(Deserialize)]
struct DocumentArgs {
    doc_name: String,
}

pub async fn handle_list_documents(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize, Default)]
    struct Args {
        filter: Option<String>,
    }

    let args: Args = match arguments {
        Some(arguments) => parse_args(Some(arguments))?,
        None => Args::default(),
    };
    let global = global.clone();

    let listings =
        run_blocking(move || docs::list_data(&global, args.filter.as_deref())).await?;

    to_text_result(&listings)
}

pub async fn handle_load_document_info(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: DocumentArgs = parse_args(arguments)?;
    let global = global.clone();

    let info = run_blocking(move || {
        docs::info_data(&global, &args.doc_name)?
            .ok_or_else(|| color_eyre::eyre::eyre!("No catalog entry for {}", args.doc_name))
    })
    .await?;

    to_text_result(&info)
}

pub async fn handle_load_document_segments(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: DocumentArgs = parse_args(arguments)?;
    let global = global.clone();

    let segmentation = run_blocking(move || docs::segments_data(&global, &args.doc_name)).await?;

    to_text_result(&segmentation)
}

pub async fn handle_search_document_content(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct Args {
        doc_name: String,
        search_terms: Vec<String>,
        max_segments: Option<usize>,
        max_chars: Option<usize>,
    }

    let args: Args = parse_args(arguments)?;
    let global = global.clone();

    let output = run_blocking(move || {
        docs::search_document_data(
            &global,
            &args.doc_name,
            &args.search_terms,
            args.max_segments.unwrap_or(DEFAULT_MAX_SEGMENTS),
            args.max_chars.unwrap_or(DEFAULT_MAX_CHARS),
        )
    })
    .await?;

    to_text_result(&output)
}

pub async fn handle_read_page_range(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    #[derive(Deserialize)]
    struct Args {
        doc_name: String,
        start_page: u32,
        end_page: u32,
    }

    let args: Args = parse_args(arguments)?;
    let global = global.clone();

    let output = run_blocking(move || {
        docs::read_pages_data(&global, &args.doc_name, args.start_page, args.end_page)
    })
    .await?;

    to_text_result(&output)
}
