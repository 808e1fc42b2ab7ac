//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tf", about = "TaskFan - scatter-gather task lookup daemon", version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground
    Run,

    /// Fetch a batch of task ids and print each result
    Fetch {
        /// Task ids, comma separated
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<i32>,

        /// Attribute names to request, comma separated
        #[arg(short, long, value_delimiter = ',')]
        attributes: Vec<String>,
    },

    /// Stream the demo feed and print items as they arrive
    Feed,
}
