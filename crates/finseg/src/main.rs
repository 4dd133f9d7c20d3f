use crate::prelude::*;
use clap::Parser;
use std::path::PathBuf;

mod docs;
mod error;
mod mcp;
mod prelude;
mod segment;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Segment OCR'd financial filings into page-covering sections and search them"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Data directory holding `markdown/` and `segments/`
    #[clap(long, env = "FINSEG_DATA_DIR", global = true, default_value = ".finance")]
    data_dir: PathBuf,

    /// JSONL document catalog (defaults to <data-dir>/financebench_document_information.jsonl)
    #[clap(long, env = "FINSEG_CATALOG", global = true)]
    catalog: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "FINSEG_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

impl Global {
    pub fn markdown_dir(&self) -> PathBuf {
        self.data_dir.join("markdown")
    }

    pub fn segments_dir(&self) -> PathBuf {
        self.data_dir.join("segments")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.catalog.clone().unwrap_or_else(|| {
            self.data_dir
                .join("financebench_document_information.jsonl")
        })
    }
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Segment documents and verify page coverage
    Segment(crate::segment::App),

    /// Browse and search segmented documents
    Docs(crate::docs::App),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Segment(sub_app) => crate::segment::run(sub_app, app.global).await,
        SubCommands::Docs(sub_app) => crate::docs::run(sub_app, app.global).await,
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
