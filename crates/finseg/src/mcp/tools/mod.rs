mod documents;

use serde::{Deserialize, Serialize};

// Re-export types needed by tool handlers
pub use super::{JsonRpcError, Tool};

// MCP Protocol types for tools
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {}),
        },
        server_info: ServerInfo {
            name: "finseg".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: format!("Internal error: {e}"),
        data: None,
    })
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let tools = vec![
        Tool {
            name: "list_documents".to_string(),
            description: "List the financial documents available in the library and whether each one has already been segmented. Document names follow the COMPANY_PERIOD_TYPE convention (e.g., '3M_2018_10K').".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "filter": {
                        "type": "string",
                        "description": "Only return documents whose name contains this text (case-insensitive)"
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: "load_document_info".to_string(),
            description: "Load catalog metadata for a financial document: company, GICS sector, document type, period and source link.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "doc_name": {
                        "type": "string",
                        "description": "Document name (e.g., '3M_2018_10K')"
                    }
                },
                "required": ["doc_name"]
            }),
        },
        Tool {
            name: "load_document_segments".to_string(),
            description: "Load the section map of a segmented document. Every page belongs to exactly one segment; each segment has a heading, a short description and an inclusive page range. Use it to decide which pages to read.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "doc_name": {
                        "type": "string",
                        "description": "Document name (e.g., '3M_2018_10K')"
                    }
                },
                "required": ["doc_name"]
            }),
        },
        Tool {
            name: "search_document_content".to_string(),
            description: "Search the segments of a document for the given terms. Segments are ranked by the fraction of terms found in their heading or description, and each result includes the text of its pages.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "doc_name": {
                        "type": "string",
                        "description": "Document name (e.g., '3M_2018_10K')"
                    },
                    "search_terms": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Terms to look for (e.g., ['revenue', 'segment'])"
                    },
                    "max_segments": {
                        "type": "number",
                        "description": "Maximum number of segments to return (default: 5)"
                    },
                    "max_chars": {
                        "type": "number",
                        "description": "Characters of page text to include per segment (default: 500)"
                    }
                },
                "required": ["doc_name", "search_terms"]
            }),
        },
        Tool {
            name: "read_page_range".to_string(),
            description: "Read the text of an inclusive page range from a document, with page markers preserved.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "doc_name": {
                        "type": "string",
                        "description": "Document name (e.g., '3M_2018_10K')"
                    },
                    "start_page": {
                        "type": "number",
                        "description": "First page, 1-indexed"
                    },
                    "end_page": {
                        "type": "number",
                        "description": "Last page, inclusive"
                    }
                },
                "required": ["doc_name", "start_page", "end_page"]
            }),
        },
    ];

    let result = ToolsList { tools };

    serde_json::to_value(result).map_err(|e| JsonRpcError {
        code: -32603,
        message: format!("Internal error: {e}"),
        data: None,
    })
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError {
            code: -32602,
            message: format!("Invalid params: {e}"),
            data: None,
        })?;

    log::debug!("tools/call {}", params.name);

    match params.name.as_str() {
        "list_documents" => documents::handle_list_documents(params.arguments, global).await,
        "load_document_info" => {
            documents::handle_load_document_info(params.arguments, global).await
        }
        "load_document_segments" => {
            documents::handle_load_document_segments(params.arguments, global).await
        }
        "search_document_content" => {
            documents::handle_search_document_content(params.arguments, global).await
        }
        "read_page_range" => documents::handle_read_page_range(params.arguments, global).await,
        _ => Err(JsonRpcError {
            code: -32602,
            message: format!("Unknown tool: {}", params.name),
            data: None,
        }),
    }
}
