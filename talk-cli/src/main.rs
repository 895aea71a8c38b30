//! # talk-cli
//!
//! Command-line front end for the talksync messaging client.
//!
//! ## Commands
//!
//! - `login`: Log in with a pincode confirmed on your phone
//! - `logout`: Forget the stored session token
//! - `list`: List contacts, groups and rooms
//! - `send`: Send a text message
//! - `history`: Show recent messages of a conversation
//! - `listen`: Print incoming messages until Ctrl-C
//!
//! ## Example
//!
//! ```bash
//! # Log in and keep the identifier for next time
//! talk-cli login --id alice@example.com --remember
//!
//! # Find a conversation
//! talk-cli list
//!
//! # Talk
//! talk-cli send u1234 "Hello!"
//! talk-cli listen
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{history, list, listen, login, logout, send};

/// Command-line talksync client.
#[derive(Parser, Debug)]
#[command(name = "talk-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for settings and the session token
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Client configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in with an e-mail address or user id
    Login {
        /// Identifier to log in with (will prompt if not provided)
        #[arg(long)]
        id: Option<String>,

        /// Remember the identifier and secret for the next login
        #[arg(long)]
        remember: bool,
    },

    /// Forget the stored session token
    Logout,

    /// List contacts, groups and rooms
    List,

    /// Send a text message
    Send {
        /// Contact, group or room id
        id: String,

        /// Message text
        text: String,
    },

    /// Show the most recent messages of a conversation
    History {
        /// Contact, group or room id
        id: String,
    },

    /// Print incoming messages until Ctrl-C
    Listen,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("talksync=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;
    config::set_dir_permissions_0700(&data_dir).await?;

    let client_config = config::load_client_config(&data_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::Login { id, remember } => {
            login::run(&data_dir, client_config, id, remember).await?;
        }
        Commands::Logout => {
            logout::run(&data_dir).await?;
        }
        Commands::List => {
            list::run(&data_dir, client_config).await?;
        }
        Commands::Send { id, text } => {
            send::run(&data_dir, client_config, &id, &text).await?;
        }
        Commands::History { id } => {
            history::run(&data_dir, client_config, &id).await?;
        }
        Commands::Listen => {
            listen::run(&data_dir, client_config).await?;
        }
    }

    Ok(())
}

/// Get the default data directory for talk-cli.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "talksync", "talk-cli")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
