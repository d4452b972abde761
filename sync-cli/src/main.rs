//! # clipsync
//!
//! Command-line ClipSync client.
//!
//! ## Commands
//!
//! - `init`: Create local settings
//! - `config`: Show or change settings
//! - `send`: Send text or a file
//! - `listen`: Print items as they arrive
//! - `history`: Show stored history
//! - `restore`: Re-send a text item from history
//! - `clear-history`: Empty history after confirmation
//! - `status`: Show local state and relay reachability
//! - `pair-code`: Generate a pairing code
//!
//! ## Example
//!
//! ```bash
//! # Initialize with a shared secret
//! clipsync init --name laptop --server ws://relay.local:4000 --secret
//!
//! # On another device
//! clipsync listen
//!
//! # Send something
//! clipsync send "Hello from the laptop"
//!
//! # Or pair two devices without a shared secret
//! clipsync pair-code
//! clipsync listen --pair ABCD-EFGH-JKLM-NPQR
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{
    clear_history, config as config_cmd, history, init, listen, pair_code, restore, send, status,
    ConnectArgs,
};
use config::FileStore;

/// Clipboard and file sync through a WebSocket relay.
#[derive(Parser, Debug)]
#[command(name = "clipsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding settings and history
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create local settings
    Init {
        /// Device name
        #[arg(long, short)]
        name: Option<String>,

        /// Relay WebSocket URL
        #[arg(long, short)]
        server: Option<String>,

        /// Prompt for a shared encryption secret
        #[arg(long)]
        secret: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: config_cmd::ConfigAction,
    },

    /// Send text, a file, or stdin
    Send {
        /// Text to send (reads stdin when omitted)
        text: Option<String>,

        /// File to send
        #[arg(long, short, conflicts_with = "text")]
        file: Option<PathBuf>,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Print items as they arrive
    Listen {
        /// Save received files into this directory
        #[arg(long)]
        save_dir: Option<PathBuf>,

        /// Exit after this many items
        #[arg(long)]
        count: Option<usize>,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Show stored history
    History {
        /// Maximum number of items to show
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Re-send a text item from history
    Restore {
        /// Item id or unique prefix
        id: String,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Empty history
    ClearHistory {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Show local state
    Status {
        /// Also try to reach the relay
        #[arg(long)]
        check: bool,

        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Generate a pairing code
    PairCode,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let store = FileStore::open(&data_dir).await?;

    match cli.command {
        Commands::Init {
            name,
            server,
            secret,
        } => {
            let secret = if secret {
                Some(init::prompt_secret("Shared secret: ")?)
            } else {
                None
            };
            init::run(&store, name.as_deref(), server.as_deref(), secret).await?;
        }
        Commands::Config { action } => {
            config_cmd::run(&store, action).await?;
        }
        Commands::Send {
            text,
            file,
            connect,
        } => {
            let payload = match (text, &file) {
                (Some(text), _) => send::Payload::Text(text),
                (None, Some(path)) => send::Payload::File(path),
                (None, None) => send::Payload::Stdin,
            };
            send::run(&store, payload, &connect).await?;
        }
        Commands::Listen {
            save_dir,
            count,
            connect,
        } => {
            listen::run(&store, &connect, save_dir.as_deref(), count).await?;
        }
        Commands::History { limit, json } => {
            history::run(&store, limit, json).await?;
        }
        Commands::Restore { id, connect } => {
            restore::run(&store, &id, &connect).await?;
        }
        Commands::ClearHistory { yes } => {
            clear_history::run(&store, yes).await?;
        }
        Commands::Status { check, connect } => {
            status::run(&store, check, &connect).await?;
        }
        Commands::PairCode => {
            pair_code::run()?;
        }
    }

    Ok(())
}

/// Get the default data directory for clipsync.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "clipsync", "clipsync")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
