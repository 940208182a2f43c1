//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for linkrelay using clap's derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// linkrelay - URL shortener and large-file relay
#[derive(Parser)]
#[command(name = "linkrelay")]
#[command(version)]
#[command(about = "URL shortener and large-file relay for chat bots", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); missing file means defaults + environment
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Act as this user id; operators are listed in access.operator_ids
    #[arg(long = "as", global = true, value_name = "USER_ID")]
    pub as_user: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Register (or update) the acting user's profile
    Register {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        handle: Option<String>,
    },

    /// Show a user's profile and counters (default: the acting user)
    Owner { owner_id: Option<i64> },

    /// Shorten a URL
    Shorten {
        /// URL, or free text with --text
        input: String,

        /// Shorten every URL found in the input text
        #[arg(long)]
        text: bool,
    },

    /// Resolve a short code (counts a click)
    Resolve { code: String },

    /// List short links, newest first
    Links {
        /// Whose links to list (default: the acting user)
        #[arg(long)]
        owner: Option<i64>,

        #[arg(long, default_value_t = 20)]
        limit: u64,
    },

    /// Delete a short link
    DeleteLink { code: String },

    /// Post a local file into the acting user's chat and store it
    Ingest { path: PathBuf },

    /// Send a local file into a chat without cataloging it
    Upload {
        path: PathBuf,

        /// Destination chat id
        #[arg(long)]
        to: i64,

        #[arg(long)]
        caption: Option<String>,
    },

    /// List stored files, newest first
    Files {
        #[arg(long)]
        owner: Option<i64>,

        #[arg(long, default_value_t = 20)]
        limit: u64,
    },

    /// Forward a stored file into a chat
    Forward {
        file_ref: String,

        /// Destination chat id
        #[arg(long)]
        to: i64,
    },

    /// Send a stored file to the acting user and count a download
    Deliver { file_ref: String },

    /// Delete a stored file
    DeleteFile { file_ref: String },

    /// Send a text to every registered, non-blocked user (operators only)
    Broadcast { text: String },

    /// Block a user from broadcasts (operators only)
    Block {
        owner_id: i64,

        /// Lift the block instead
        #[arg(long)]
        unblock: bool,
    },

    /// Show global statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove stale files from the temp directory
    Cleanup,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: linkrelay.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
