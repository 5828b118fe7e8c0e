//! sluice-cat — stream a file to stdout through the backpressure adapter.
//!
//! Mostly a smoke test for sources: reads are only issued as fast as
//! stdout accepts the previous buffer.

use std::path::PathBuf;

use clap::Parser;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;

use sluicegate::{AdapterConfig, AsyncReadSource, BinaryPublisher, SluiceError};

/// Copy a file to stdout in demand-driven chunks.
#[derive(Parser)]
#[command(name = "sluice-cat")]
#[command(version)]
#[command(about = "Stream a file to stdout through sluicegate")]
struct Args {
    /// File to read.
    path: PathBuf,

    /// Bytes per read (overrides the config file).
    #[arg(short, long, env = "SLUICE_BUFFER_SIZE")]
    buffer_size: Option<usize>,

    /// TOML file holding an adapter config.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<AdapterConfig, SluiceError> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                SluiceError::Configuration(format!("{}: {e}", path.display()))
            })?
        }
        None => AdapterConfig::default(),
    };
    if let Some(size) = args.buffer_size {
        config = config.buffer_size(size);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let file = tokio::fs::File::open(&args.path).await?;
    let mut stream = BinaryPublisher::new(AsyncReadSource::new(file))
        .config(config)
        .into_stream()?;

    let mut stdout = tokio::io::stdout();
    let mut total = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        total += chunk.len() as u64;
        stdout.write_all(&chunk).await?;
    }
    stdout.flush().await?;

    info!(path = %args.path.display(), bytes = total, "done");
    Ok(())
}
