//! # Ribbon
//!
//! A terminal bookmark manager synced to a hosted Postgres backend.
//!
//! ## Architecture
//!
//! ```text
//! Gateway (HTTP) → SessionController → BookmarkStore → UI
//! ```
//!
//! - [`gateway`]: REST and auth client for the hosted backend
//! - [`session`]: Sign-in lifecycle and data synchronization
//! - [`store`]: In-memory bookmark collection, refreshed wholesale
//! - [`tui`]: Terminal user interface built with ratatui
//!
//! ## Quick Start
//!
//! ```bash
//! # Sign in through your browser
//! ribbon login
//!
//! # Add a bookmark
//! ribbon add "Rust blog" https://blog.rust-lang.org
//!
//! # List bookmarks
//! ribbon list
//!
//! # Launch TUI
//! ribbon tui
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the gateway
/// and configuration, and hands out session controllers.
pub mod app;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `login` / `logout` - Session management
/// - `add <title> <url>` - Add a bookmark
/// - `remove <id>` - Remove a bookmark
/// - `list` - List bookmarks, newest first
/// - `status` - Show signed-in user
/// - `tui` - Launch the TUI
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/ribbon/config.toml`: backend URL and anon key,
/// OAuth provider and redirect, change-feed poll interval.
pub mod config;

/// Core domain models.
///
/// - [`Bookmark`](domain::Bookmark): A saved link owned by a user
/// - [`User`](domain::User) / [`Session`](domain::Session): Auth identity
pub mod domain;

/// Backend access.
///
/// - [`Gateway`](gateway::Gateway): Async trait covering auth, bookmark
///   reads/writes, and change subscriptions
/// - [`HttpGateway`](gateway::HttpGateway): reqwest-based implementation
pub mod gateway;

/// Session lifecycle and data synchronization.
///
/// [`SessionController`](session::SessionController) reacts to auth and
/// change events, keeps the store scoped to the signed-in user, and holds
/// at most one open change subscription.
pub mod session;

/// In-memory bookmark collection.
///
/// [`BookmarkStore`](store::BookmarkStore) is replaced wholesale on every
/// refresh and discards fetches that outlive their session.
pub mod store;

/// Terminal user interface.
///
/// Single-list layout built with ratatui. Keybindings: j/k navigate,
/// a adds, d deletes, o opens in browser, R refreshes, s/S sign in and
/// out, q quits.
pub mod tui;
