//! CLI command definitions and handlers

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

use crate::cache::FolderCache;
use crate::config::Config;
use crate::drive::DriveClient;
use crate::error::{ConfigError, Result};
use crate::session::SessionDriver;

pub mod check;
pub mod completions;
pub mod init;
pub mod serve;
pub mod status;
pub mod upload;

/// RoadCrew - files crew photos into dated Google Drive folders
#[derive(Parser, Debug)]
#[command(name = "roadcrew")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Override config file location
    #[arg(long, global = true, env = "ROADCREW_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "ROADCREW_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize RoadCrew configuration
    Init,

    /// Show configuration status
    Status,

    /// Run one upload session from a chat-event file
    Upload {
        /// JSON file holding one chat event or an array of events
        event_file: PathBuf,
    },

    /// Read chat events from stdin (one JSON object per line) and upload
    Serve,

    /// Verify access to the configured root folder
    Check {
        /// Create a probe folder under the root and share it with this email
        #[arg(long)]
        share: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// Display version information
    Version,
}

/// Load configuration from the override path or the default location
pub fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(p) => Config::load_from(PathBuf::from(p)),
        None => Config::load(),
    }
}

/// Build a Drive client from validated configuration
pub fn drive_client(config: &Config) -> Result<DriveClient> {
    let token = config
        .storage_token
        .clone()
        .ok_or(ConfigError::MissingToken)?;
    Ok(DriveClient::new(token)?)
}

/// Wire a session driver against a shared client and cache
pub fn build_driver(
    config: &Config,
    drive: Arc<DriveClient>,
    cache: Arc<FolderCache>,
) -> Result<SessionDriver<DriveClient>> {
    let root = config
        .root_folder_id
        .clone()
        .ok_or(ConfigError::MissingRootFolder)?;
    Ok(SessionDriver::new(
        drive,
        cache,
        root,
        config.org_time_zone()?,
        config.scratch_dir(),
    )?
    .with_duplicate_rule(config.uploads.duplicate_rule))
}
