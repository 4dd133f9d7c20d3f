use crate::prelude::{eprintln, *};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::{Any, CorsLayer};

const MESSAGE_PATH: &str = "/message";

/// Shared by every connection: requests arrive on `/message` and their
/// responses fan out to every open `/sse` stream.
#[derive(Clone)]
pub struct SseState {
    global: Arc<crate::Global>,
    responses: broadcast::Sender<String>,
}

impl SseState {
    pub fn new(global: crate::Global, buffer: usize) -> Self {
        let (responses, _) = broadcast::channel(buffer.max(1));
        Self {
            global: Arc::new(global),
            responses,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.responses.subscribe()
    }

    /// Handle one JSON-RPC request and relay the response to open streams.
    pub async fn dispatch(&self, request: &serde_json::Value) -> serde_json::Value {
        let request_str = serde_json::to_string(request).unwrap_or_default();
        log::debug!("message: {request_str}");

        let response = super::handle_request(&request_str, &self.global).await;
        let response = serde_json::to_value(response).unwrap_or(serde_json::Value::Null);

        match self.responses.send(response.to_string()) {
            Ok(streams) => log::trace!("relayed response to {streams} streams"),
            Err(_) => log::debug!("no open SSE streams, response returned inline only"),
        }

        response
    }
}

/// Responses from `receiver` in send order. A client that falls behind
/// skips what it missed; the stream ends once the server drops the sender.
fn relay(receiver: broadcast::Receiver<String>) -> impl Stream<Item = String> + Send {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(message) => return Some((message, receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("SSE client fell behind, skipped {skipped} responses");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

pub async fn run_sse(options: super::cli::SseOptions, global: crate::Global) -> Result<()> {
    let addr = options.addr();

    if global.verbose {
        eprintln!("Starting finseg MCP server with SSE transport on {addr}...");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app_router = Router::new()
        .route("/sse", get(sse_handler))
        .route(MESSAGE_PATH, post(message_handler))
        .layer(cors)
        .with_state(SseState::new(global, options.buffer));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    log::info!("finseg MCP server listening on http://{addr} (streams on /sse, requests on {MESSAGE_PATH})");

    axum::serve(listener, app_router)
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

/// Announce the message endpoint, then stream every response as a
/// `message` event.
async fn sse_handler(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    log::debug!("SSE client connected");

    let endpoint = stream::once(async { Ok(Event::default().event("endpoint").data(MESSAGE_PATH)) });
    let messages =
        relay(state.subscribe()).map(|json| Ok(Event::default().event("message").data(json)));

    Sse::new(endpoint.chain(messages)).keep_alive(KeepAlive::default())
}

async fn message_handler(
    State(state): State<SseState>,
    Json(request): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    Json(state.dispatch(&request).await)
}
