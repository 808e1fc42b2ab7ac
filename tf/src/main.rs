//! TaskFan - scatter-gather task lookup daemon
//!
//! CLI entry point.

use std::collections::BTreeSet;
use std::collections::HashMap;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use taskfan::cli::{Cli, Command};
use taskfan::config::Config;
use taskfan::daemon;

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Fetch { ids, attributes }) => cmd_fetch(&config, ids, attributes).await,
        Some(Command::Feed) => cmd_feed(&config).await,
        Some(Command::Run) | None => daemon::run(&config).await,
    }
}

/// Wire an engine, run one batch fetch, print each result as JSON.
async fn cmd_fetch(config: &Config, ids: Vec<i32>, attributes: Vec<String>) -> Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let engine = daemon::build(config, &env)?;

    let results = engine
        .fetcher
        .fetch_batch(ids, attributes.into_iter().collect())
        .await
        .context("Batch fetch failed")?;

    for item in results {
        match item {
            Ok(response) => println!("{}", serde_json::to_string(&response)?),
            Err(error) => eprintln!("{error}"),
        }
    }

    engine.shutdown().await;
    Ok(())
}

/// Wire an engine and stream the demo feed until it ends.
async fn cmd_feed(config: &Config) -> Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let engine = daemon::build(config, &env)?;

    let mut feed = engine
        .fetcher
        .demo_feed(BTreeSet::new())
        .await
        .context("Feed could not be opened")?;

    while let Some(item) = feed.recv().await {
        match item {
            Ok(response) => println!("{}", serde_json::to_string(&response)?),
            Err(error) => eprintln!("{error}"),
        }
    }

    engine.shutdown().await;
    Ok(())
}
