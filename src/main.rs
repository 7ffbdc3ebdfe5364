//! Tune Keeper - a media library index.
//!
//! Maintains user-facing views (favourites, hidden entries, custom
//! playlists, play statistics) derived from an external track catalog, and
//! keeps them truthful as the catalog changes underneath.

pub mod access;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod consistency;
pub mod db;
pub mod error;
pub mod model;
pub mod queue;
pub mod repo;
pub mod stats;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("tune_keeper=info".parse()?))
        .init();

    cli::run_command(args)
}
