use anyhow::Result;
use clap::Parser;
use cql_search::{start_server, ServiceConfig, WriteMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cql-search-api")]
#[command(about = "CommonQL Search API Server")]
struct Args {
    /// Service configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind the server to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the server to
    #[arg(long)]
    port: Option<u16>,

    /// Path to the index directory; an in-memory index is used when none is configured
    #[arg(long)]
    index_path: Option<PathBuf>,

    /// Accept JSON envelopes instead of extracting from source locations
    #[arg(long)]
    envelope: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(index_path) = args.index_path {
        config.index.path = Some(index_path);
    }
    if args.envelope {
        config.write_mode = WriteMode::Envelope;
    }

    log::info!("Starting CommonQL Search API Server...");
    start_server(config).await?;

    Ok(())
}
