pub mod commands;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "ribbon")]
#[command(about = "A terminal bookmark manager synced to a hosted backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in through the configured OAuth provider
    Login,
    /// Sign out and clear the cached session
    Logout,
    /// List your bookmarks, newest first
    List,
    /// Add a bookmark
    Add {
        /// Display title
        title: String,
        /// Target URL
        url: String,
    },
    /// Remove a bookmark by id
    Remove {
        /// Bookmark id (shown by `list`)
        id: Uuid,
    },
    /// Show the signed-in user and bookmark count
    Status,
    /// Launch the TUI
    Tui,
}
