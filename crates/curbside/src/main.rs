//! Curbside - response cache and session monitor for the waste-collection portal
//!
//! Main entry point for the Curbside CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{cache_check, config, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Curbside - response cache and session monitor for the waste-collection portal
#[derive(Parser)]
#[command(name = "curbside")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User config directory (default: ~/.config/curbside)
    #[arg(long, global = true, env = "CURBSIDE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration management
    Config(config::ConfigArgs),

    /// Watch an idle session from the terminal
    Watch(watch::WatchArgs),

    /// Exercise the response cache and report its statistics
    CacheCheck(cache_check::CacheCheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().or_else(curbside_config::xdg_config_dir);

    // A broken config must not stop `config path` from reporting it.
    let logging = curbside_config::load_config_with_options(None, config_dir.as_deref())
        .map(|loaded| loaded.config.logging())
        .unwrap_or_default();

    // Initialize tracing: console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "curbside=debug,curbside_cache=debug,curbside_session=debug,curbside_config=debug,info"
    } else {
        "curbside=info,curbside_cache=info,curbside_session=info,warn"
    };

    let (file_layer, _guard) = if logging.file {
        let log_dir = logging
            .directory
            .clone()
            .or_else(|| config_dir.as_ref().map(|d| d.join("logs")))
            .unwrap_or_else(|| PathBuf::from("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "curbside.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(
                "curbside=trace,curbside_cache=trace,curbside_session=trace,curbside_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir,
    };

    match cli.command {
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
        Commands::CacheCheck(args) => cache_check::run(args, &ctx).await,
    }
}
