//! Command-line interface for tune-keeper.
//!
//! Subcommands for browsing the catalog, managing favourites, hidden
//! entries and custom playlists, recording plays, and querying statistics.

mod commands;

pub use commands::{Cli, Commands, run_command};
