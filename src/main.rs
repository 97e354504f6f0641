use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cql_search::{DocumentStore, IndexRequest, SearchServices, ServiceConfig};
use std::fs::File;
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "cql-search")]
#[command(about = "Index documents and run CommonQL queries against a local index")]
#[command(version)]
struct Args {
    /// Service configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Index directory, overriding the configuration
    #[arg(short, long)]
    index_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a document from its source location and index it
    Index {
        id: String,
        source: Url,
        metadata: Url,
        #[arg(long)]
        media_type: Option<String>,
    },
    /// Index a JSON envelope carrying pre-extracted text
    Envelope {
        id: String,
        file: PathBuf,
        #[arg(long, default_value = "application/json")]
        media_type: String,
    },
    /// Print the locators matching a CommonQL filter
    Search { query: String },
    /// Remove one document
    Delete { id: String },
    /// Remove every document
    Purge,
    /// Print the number of indexed documents
    Count,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(index_path) = args.index_path {
        config.index.path = Some(index_path);
    }
    if config.index.path.is_none() {
        anyhow::bail!("An index path is required; pass --index-path or set index.path in the configuration");
    }

    let services = SearchServices::from_config(&config)?;
    match args.command {
        Command::Index { id, source, metadata, media_type } => {
            let request = IndexRequest { source_location: source, metadata_location: metadata, media_type };
            services.writer.index(&id, &request)?;
            println!("Indexed {}", id);
        }
        Command::Envelope { id, file, media_type } => {
            let payload = File::open(&file).with_context(|| format!("Failed to open {}", file.display()))?;
            services.writer.index_envelope(&id, &media_type, payload)?;
            println!("Indexed {}", id);
        }
        Command::Search { query } => {
            let locators = services.queries.find(&query)?;
            for locator in &locators {
                println!("{}", locator);
            }
            println!("{} result(s)", locators.len());
        }
        Command::Delete { id } => {
            if services.store.delete_by_id(&id)? {
                println!("Deleted {}", id);
            } else {
                println!("No document with identity {}", id);
            }
        }
        Command::Purge => {
            services.store.delete_all()?;
            println!("Deleted all documents");
        }
        Command::Count => {
            println!("{}", services.store.count()?);
        }
    }
    Ok(())
}
