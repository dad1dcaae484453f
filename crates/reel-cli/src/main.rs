//! Reel CLI - Headless Session Runner
//!
//! Features:
//! - Configuration inspection (defaults, persisted settings, overrides)
//! - Playlist filtering and provider selection report
//! - Simulated playback through the session controller

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod demo;
mod output;

use output::OutputFormat;

/// Reel CLI - Media player session toolkit
#[derive(Parser)]
#[command(name = "reel")]
#[command(author = "Reel Contributors")]
#[command(version)]
#[command(about = "Inspect player configuration and simulate playback sessions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// JSON file with config overrides
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Config override as key=value (repeatable)
    #[arg(short, long = "set", global = true)]
    set: Vec<String>,

    /// Persisted settings file (in-memory when omitted)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the merged configuration
    Config,

    /// Show which sources of a playlist are playable and by which provider
    Inspect {
        /// Path to a JSON playlist
        playlist: PathBuf,

        /// Treat HLS as unsupported unless androidhls is set
        #[arg(long)]
        restricted_hls: bool,
    },

    /// Play a playlist with simulated providers and print the event stream
    Play {
        /// Path to a JSON playlist (defaults to the configured playlist)
        playlist: Option<PathBuf>,

        /// Item to start from (negative counts from the end)
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        item: i64,

        /// Volume to set before playing (0-100)
        #[arg(long)]
        volume: Option<f64>,

        /// Mute before playing
        #[arg(long)]
        mute: bool,

        /// Treat HLS as unsupported unless androidhls is set
        #[arg(long)]
        restricted_hls: bool,

        /// Simulated duration of every item in seconds
        #[arg(short, long, default_value = "10")]
        duration: f64,

        /// Interval between time updates in seconds
        #[arg(long, default_value = "2.5")]
        step: f64,

        /// Maximum number of items to play when repeat is on
        #[arg(long, default_value = "10")]
        max_items: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .init();
    }
    reel_core::init();

    let format = OutputFormat::from(cli.format.as_str());
    let user = commands::user_config(cli.config.as_deref(), &cli.set)?;
    let settings = commands::settings_store(cli.settings);

    match cli.command {
        Commands::Config => {
            commands::config(user, settings, format).await?;
        }
        Commands::Inspect { playlist, restricted_hls } => {
            commands::inspect(&playlist, user, restricted_hls, format).await?;
        }
        Commands::Play {
            playlist,
            item,
            volume,
            mute,
            restricted_hls,
            duration,
            step,
            max_items,
        } => {
            if step <= 0.0 {
                anyhow::bail!("--step must be positive");
            }
            let options = commands::PlayOptions {
                playlist,
                start: item,
                volume,
                mute,
                restricted_hls,
                script: demo::Script { duration, step },
                max_items,
            };
            commands::play(options, user, settings, format).await?;
        }
    }

    Ok(())
}
