//! wmx - WMX component marketplace CLI
//!
//! Every subcommand is a thin front end over [`wmx_core::Marketplace`].
//! `wmx serve` exposes the same operations as JSON lines on stdin/stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use wmx_core::{Marketplace, Settings};

mod component_cli;
mod publish_cli;

use component_cli::ComponentSubcommand;
use publish_cli::PublishSubcommand;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "wmx",
    about = "Discover, install, validate and publish WMX components",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level (defaults to the configured log_level)
    #[clap(long, global = true)]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    log_json: bool,

    /// Settings file (defaults to ./wmx.yaml, then the user config dir)
    #[clap(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer tool requests as JSON lines on stdin/stdout
    Serve,

    #[clap(flatten)]
    Component(ComponentSubcommand),

    #[clap(flatten)]
    Publish(PublishSubcommand),
}

fn initialize_tracing(directive: &str, json: bool) {
    // RUST_LOG wins over the CLI flag and the settings file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr) // stdout carries command output
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr) // stdout carries command output
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;
    let directive = cli
        .log_level
        .as_ref()
        .map(|level| level.to_filter_directive().to_string())
        .unwrap_or_else(|| settings.log_level.to_lowercase());
    initialize_tracing(&directive, cli.log_json);

    debug!("Loaded settings: catalog={:?}", settings.catalog);
    let marketplace = Marketplace::from_settings(settings)?;

    match cli.command {
        Command::Serve => serve(&marketplace).await,
        Command::Component(command) => command.execute(&marketplace).await,
        Command::Publish(command) => command.execute(&marketplace).await,
    }
}

/// Read one JSON request per line and write one JSON response per line
async fn serve(marketplace: &Marketplace) -> Result<()> {
    info!("Serving tool requests on stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read request from stdin")?
    {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(request) => marketplace.handle_value(&request).await,
            Err(e) => serde_json::json!({
                "success": false,
                "error": format!("Malformed JSON: {e}"),
                "error_kind": "invalid_request",
                "message": "Invalid tool request",
            }),
        };

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
