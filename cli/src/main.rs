//! Quarry command-line interface.
//!
//! Loads a dataset, runs one JSON query request against it and prints the
//! JSON response.
//!
//! # Usage
//!
//! ```bash
//! # Query CSV/JSON files in a directory
//! quarry --data ./chinook --request album_query.json
//!
//! # Read the request from stdin
//! cat album_query.json | quarry --data ./chinook
//!
//! # Query through a Spark cluster
//! quarry --livy http://livy:8998 --data ./chinook --request album_query.json
//!
//! # Print the inferred schema
//! quarry --data ./chinook --schema
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use quarry_livy::{LivyConfig, LivySource};
use quarry_query::RowSource;
use quarry_registry::TableSchema;
use quarry_session::Session;
use quarry_source::load_directory;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Quarry query engine
#[derive(Parser, Debug)]
#[command(
    name = "quarry",
    version,
    about = "Run nested query requests against flat files or a Spark cluster"
)]
struct Args {
    /// Directory of CSV/JSON files (and an optional config.json)
    #[arg(short = 'd', long, value_name = "DIR", env = "QUARRY_DATA")]
    data: Option<PathBuf>,

    #[command(flatten)]
    livy: LivyConfig,

    /// Read the JSON request from a file instead of stdin
    #[arg(short = 'r', long, value_name = "FILE")]
    request: Option<PathBuf>,

    /// Print the schema instead of running a request
    #[arg(long)]
    schema: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Serialize)]
struct SchemaResponse {
    tables: Vec<TableSchema>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let source = open_source(&args).await?;
    let session = Session::new(source)
        .await
        .context("failed to read the source schema")?;

    let output = if args.schema {
        serde_json::to_string_pretty(&SchemaResponse {
            tables: session.schema(),
        })?
    } else {
        let request = read_request(args.request.as_deref())?;
        let response = session.execute_json(&request).await?;
        serde_json::to_string_pretty(&response)?
    };
    println!("{}", output);
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The Spark source when a Livy URL is configured, otherwise the data
/// directory loaded into memory.
async fn open_source(args: &Args) -> Result<Arc<dyn RowSource>> {
    if args.livy.url.is_some() {
        let source = LivySource::connect(&args.livy, args.data.as_deref())
            .await
            .context("failed to start the Spark source")?;
        info!(tables = source.tables().len(), "connected to Livy");
        return Ok(Arc::new(source));
    }

    let Some(dir) = args.data.clone() else {
        bail!("either --data or --livy is required");
    };
    let path = dir.clone();
    let source = tokio::task::spawn_blocking(move || load_directory(&path))
        .await
        .context("dataset loader panicked")?
        .with_context(|| format!("failed to load {}", dir.display()))?;
    Ok(Arc::new(source))
}

fn read_request(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read request from stdin")?;
            Ok(input)
        }
    }
}
