//! eventsource-cli - listen to Server-Sent-Events streams
//!
//! Connects to a stream, prints every data event, and stops on Ctrl+C or when
//! the server closes the stream.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "eventsource-cli")]
#[command(author, version, about = "Server-Sent-Events stream listener")]
#[command(propagate_version = true)]
struct Cli {
    /// Stream URL
    #[arg(short, long, env = "EVENTSOURCE_URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "EVENTSOURCE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print events from the stream until Ctrl+C or end of stream
    Listen {
        /// Also print heartbeats
        #[arg(long)]
        heartbeats: bool,

        /// Stop after this many data events
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let (config, config_file) = if let Some(config_path) = &cli.config {
        (
            Config::load_from(config_path)?,
            config_path.display().to_string(),
        )
    } else {
        let path = Config::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "-".to_string());
        (Config::load().unwrap_or_default(), path)
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(
        cli.url.as_deref(),
        cli.output.map(OutputFormat::as_str),
        cli.no_color,
    );
    let format = OutputFormat::from_str(&merged.output, true)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Invalid output format in config: {}", merged.output))?;

    // Create output context
    let ctx = OutputContext::new(format, merged.no_color, cli.quiet);

    // Execute command
    match &cli.command {
        Commands::Listen { heartbeats, limit } => {
            commands::listen(&merged.url, &merged.transport, *heartbeats, *limit, &ctx).await?;
        }

        Commands::Config => {
            commands::config::show(&merged, &config_file, &ctx)?;
        }
    }

    Ok(())
}
