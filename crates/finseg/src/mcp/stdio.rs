use crate::prelude::{eprintln, *};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Serve newline-delimited JSON-RPC over stdin/stdout until EOF.
pub async fn run_stdio(global: crate::Global) -> Result<()> {
    log::info!(
        "finseg MCP server on stdio (data dir {})",
        global.data_dir.display()
    );
    if global.verbose {
        eprintln!("Starting finseg MCP server with stdio transport...");
        eprintln!();
    }

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let request = line.trim();
        if request.is_empty() {
            continue;
        }

        if global.verbose {
            eprintln!("Received: {request}");
        }

        let response = super::handle_request(request, &global).await;
        let response_json = serde_json::to_string(&response)?;

        if global.verbose {
            eprintln!("Sending: {response_json}");
        }

        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    log::info!("stdin closed, shutting down");
    Ok(())
}
