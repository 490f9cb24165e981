//! Reel CLI - Source and Handler Probe
//!
//! Features:
//! - Source classification (URLs and JSON stream descriptors)
//! - Stream handler planning for a given set of platform capabilities

use clap::{Parser, Subcommand};

mod commands;
mod output;

/// Reel CLI - Playback orchestration probe
#[derive(Parser)]
#[command(name = "reel-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Classify media sources and preview stream handler selection", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify sources into typed streams
    Classify {
        /// URLs or JSON descriptors like '{"url":"a.m3u8","type":"HLS"}'
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Show which stream handlers would play the sources
    Plan {
        /// URLs or JSON descriptors, earlier entries win ties
        #[arg(required = true)]
        sources: Vec<String>,

        /// Platform capabilities: a preset (all, desktop, none) or a list
        /// of mse, hls, dash, mp4, webm
        #[arg(short, long, default_value = "desktop")]
        env: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    reel_core::init();

    match cli.command {
        Commands::Classify { sources } => {
            commands::classify(&sources, &cli.format)?;
        }
        Commands::Plan { sources, env } => {
            commands::plan(&sources, &env, &cli.format)?;
        }
    }

    Ok(())
}
