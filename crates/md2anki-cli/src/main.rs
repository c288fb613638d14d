mod commands;
mod config;
mod host;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{ArgAction, Parser};
use md2anki::{Pipeline, RunOptions, SyncConfig};
use md2anki_connect::{AnkiConnectClient, AnkiConnectConfig};
use tracing_subscriber::EnvFilter;

use crate::host::ProcessHost;

#[derive(Parser)]
#[command(name = "md2anki")]
#[command(about = "Add a markdown note to Anki, updating it if it already exists")]
struct Cli {
    /// Path to the markdown file
    #[arg(short, long)]
    file: PathBuf,
    /// Target deck (defaults to the front matter `deck`, then the configured deck)
    #[arg(short, long)]
    deck: Option<String>,
    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// AnkiConnect endpoint URL
    #[arg(long)]
    endpoint: Option<String>,
    /// Fail instead of launching Anki when it is not running
    #[arg(long)]
    no_launch: bool,
    /// Print the rendered note without contacting Anki
    #[arg(long)]
    dry_run: bool,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<SyncConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_from(path)?,
        None => config::load_default(),
    };

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if cli.no_launch {
        config.service.auto_launch = false;
    }

    Ok(config)
}

fn build_pipeline(config: SyncConfig) -> Result<Pipeline> {
    let client = Arc::new(AnkiConnectClient::new(AnkiConnectConfig::from(&config))?);
    let host = Arc::new(ProcessHost::new(&config.service));
    Ok(Pipeline::new(config, client.clone(), host, client))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = build_config(&cli)?;
    let options = RunOptions {
        deck: cli.deck.clone(),
    };
    let pipeline = build_pipeline(config)?;

    if cli.dry_run {
        commands::preview::run(&pipeline, &cli.file, &options)
    } else {
        commands::sync::run(&pipeline, &cli.file, &options).await
    }
}
