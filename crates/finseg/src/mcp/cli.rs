#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Serve segmented documents to MCP clients")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Serve over stdin/stdout, one JSON-RPC message per line
    #[clap(name = "stdio")]
    Stdio,

    /// Serve over HTTP: POST requests to /message, read responses from /sse
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, Clone, clap::Args)]
pub struct SseOptions {
    /// Port to listen on
    #[arg(short, long, env = "FINSEG_MCP_PORT", default_value = "3000")]
    pub port: u16,

    /// Address to bind to
    #[arg(long, env = "FINSEG_MCP_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Responses buffered per SSE client before the slowest one starts
    /// dropping them
    #[arg(long, env = "FINSEG_MCP_BUFFER", default_value = "64")]
    pub buffer: usize,
}

impl SseOptions {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
