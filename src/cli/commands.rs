//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed
//! arguments and returns an `anyhow::Result<()>`.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::access::{Sha256Verifier, digest_hex, unlock};
use crate::catalog::{self, ArtistFilter, TrackFilter};
use crate::config;
use crate::model::{MarkTarget, PlaylistKind, StatKind, StatWindow, Track};
use crate::queue;
use crate::repo::Library;

/// Tune Keeper CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// A favourite or hidden target on the command line: exactly one of an
/// artist name or a playlist title (with its kind).
#[derive(Args)]
pub struct TargetArgs {
    /// Artist name
    #[arg(long, conflicts_with = "playlist")]
    artist: Option<String>,
    /// Playlist title
    #[arg(long)]
    playlist: Option<String>,
    /// Playlist kind: album, custom, guess_the_melody
    #[arg(long, default_value = "album", requires = "playlist")]
    kind: String,
}

impl TargetArgs {
    fn into_target(self) -> anyhow::Result<MarkTarget> {
        match (self.artist, self.playlist) {
            (Some(name), None) => Ok(MarkTarget::artist(name)),
            (None, Some(title)) => {
                let kind = PlaylistKind::parse(&self.kind)?;
                Ok(MarkTarget::playlist(title, kind))
            }
            _ => bail!("specify exactly one of --artist or --playlist"),
        }
    }
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// List catalog tracks
    List {
        /// Only tracks by this artist
        #[arg(long, conflicts_with = "playlist")]
        artist: Option<String>,
        /// Only tracks in this catalog container (album)
        #[arg(long)]
        playlist: Option<String>,
    },
    /// List catalog artists
    Artists,
    /// Replace the mirrored catalog from a TOML track listing
    Import {
        /// Path to a TOML file with a [[tracks]] array
        path: PathBuf,
    },
    /// Build the playback queue for a selected track
    Queue {
        /// Path of the selected track
        path: String,
        /// Scope: tracks in this container (album)
        #[arg(long, conflicts_with = "artist")]
        playlist: Option<String>,
        /// Scope: tracks by this artist
        #[arg(long)]
        artist: Option<String>,
    },
    /// Record a play of a track (updates track and artist statistics)
    Play {
        /// Path of the played track
        path: String,
    },
    /// Manage favourites
    #[command(subcommand)]
    Favourites(FavouritesCommand),
    /// Manage hidden playlists and artists
    #[command(subcommand)]
    Hidden(HiddenCommand),
    /// Manage custom playlists
    #[command(subcommand)]
    Playlist(PlaylistCommand),
    /// Query play statistics
    #[command(subcommand)]
    Stats(StatsCommand),
}

#[derive(Subcommand)]
pub enum FavouritesCommand {
    /// Mark a playlist or artist as a favourite
    Add(TargetArgs),
    /// Remove a favourite mark
    Remove(TargetArgs),
    /// List favourites, resolved against the catalog
    List,
}

#[derive(Subcommand)]
pub enum HiddenCommand {
    /// Hide a playlist or artist
    Hide(TargetArgs),
    /// Unhide a playlist or artist
    Unhide(TargetArgs),
    /// List hidden entries (requires the secret)
    List {
        /// Secret that unlocks the hidden view
        #[arg(long, env = "TUNE_KEEPER_SECRET")]
        secret: String,
    },
    /// Set the secret that protects the hidden view
    SetSecret {
        /// The new secret
        secret: String,
    },
}

#[derive(Subcommand)]
pub enum PlaylistCommand {
    /// Create a custom playlist
    Create { title: String },
    /// Delete a custom playlist and its membership
    Delete { title: String },
    /// Rename a custom playlist
    Rename { title: String, new_title: String },
    /// Append a catalog track to a custom playlist
    AddTrack { title: String, path: String },
    /// Remove a track from a custom playlist
    RemoveTrack { title: String, path: String },
    /// Show a custom playlist's tracks in curated order
    Show { title: String },
    /// List custom playlists
    List,
}

#[derive(Subcommand)]
pub enum StatsCommand {
    /// Show the full record for one key
    Show {
        /// Record kind: track, artist, global
        kind: String,
        /// Track path, artist name, or global counter key
        key: String,
    },
    /// Rank keys of a kind by a counter window
    Top {
        /// Record kind: track, artist, global
        kind: String,
        /// Window: all-time, yearly, monthly, weekly, daily
        #[arg(long, default_value = "all-time")]
        window: String,
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

/// Run the parsed CLI command to completion.
pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let config = config::load();

    rt.block_on(async {
        let library = Library::shared(&config).await?;
        match cli.command {
            Commands::List { artist, playlist } => cmd_list(&library, artist, playlist).await,
            Commands::Artists => cmd_artists(&library).await,
            Commands::Import { path } => cmd_import(&library, &path).await,
            Commands::Queue {
                path,
                playlist,
                artist,
            } => cmd_queue(&library, &path, playlist, artist).await,
            Commands::Play { path } => cmd_play(&library, &path).await,
            Commands::Favourites(cmd) => cmd_favourites(&library, cmd).await,
            Commands::Hidden(cmd) => cmd_hidden(&library, &config, cmd).await,
            Commands::Playlist(cmd) => cmd_playlist(&library, cmd).await,
            Commands::Stats(cmd) => cmd_stats(&library, cmd).await,
        }
    })
}

async fn cmd_list(
    library: &Library,
    artist: Option<String>,
    playlist: Option<String>,
) -> anyhow::Result<()> {
    let filter = match (artist, playlist) {
        (Some(name), None) => TrackFilter::ByArtist(name),
        (None, Some(title)) => TrackFilter::ByPlaylist(title),
        (None, None) => TrackFilter::All,
        _ => bail!("specify at most one of --artist or --playlist"),
    };
    let tracks = library.catalog().list_tracks(&filter).await?;
    for track in &tracks {
        println!(
            "{} - {} [{}] {}",
            track.artist, track.title, track.playlist_name, track.path
        );
    }
    println!("{} tracks", tracks.len());
    Ok(())
}

async fn cmd_artists(library: &Library) -> anyhow::Result<()> {
    let artists = library.catalog().list_artists(&ArtistFilter::All).await?;
    for artist in artists {
        println!("{}", artist.name);
    }
    Ok(())
}

/// A track row in the import file; ids are assigned on import.
#[derive(serde::Deserialize)]
struct ImportTrack {
    title: String,
    artist: String,
    album: String,
    path: String,
    #[serde(default)]
    duration_ms: Option<i64>,
    #[serde(default)]
    added_date: Option<i64>,
    #[serde(default)]
    track_number: Option<i64>,
}

#[derive(serde::Deserialize)]
struct ImportFile {
    #[serde(default)]
    tracks: Vec<ImportTrack>,
}

async fn cmd_import(library: &Library, path: &PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: ImportFile = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let tracks: Vec<Track> = file
        .tracks
        .into_iter()
        .enumerate()
        .map(|(i, t)| Track {
            id: i as i64 + 1,
            title: t.title,
            artist: t.artist,
            playlist_name: t.album,
            path: t.path,
            duration_ms: t.duration_ms,
            added_date: t.added_date,
            track_number: t.track_number,
        })
        .collect();

    catalog::replace_all(library.pool(), &tracks).await?;
    println!("Imported {} tracks", tracks.len());
    Ok(())
}

async fn cmd_queue(
    library: &Library,
    path: &str,
    playlist: Option<String>,
    artist: Option<String>,
) -> anyhow::Result<()> {
    let filter = match (playlist, artist) {
        (Some(title), None) => TrackFilter::ByPlaylist(title),
        (None, Some(name)) => TrackFilter::ByArtist(name),
        (None, None) => TrackFilter::All,
        _ => bail!("specify at most one of --playlist or --artist"),
    };
    let scope = library.catalog().list_tracks(&filter).await?;
    let queue = queue::build_queue(&scope, path)?;
    for (i, track) in queue.iter().enumerate() {
        println!("{:3}. {} - {}", i + 1, track.artist, track.title);
    }
    Ok(())
}

async fn cmd_play(library: &Library, path: &str) -> anyhow::Result<()> {
    let found = library
        .catalog()
        .list_tracks(&TrackFilter::ByPath(path.to_string()))
        .await?;
    let Some(track) = found.into_iter().next() else {
        bail!("no track at '{path}' in the catalog");
    };

    let engine = library.stats_engine();
    let record = engine.record_play(&track.path).await?;
    engine.record_artist_play(&track.artist).await?;
    println!(
        "Recorded play of '{}' (all-time {})",
        track.title, record.all_time
    );
    Ok(())
}

async fn cmd_favourites(library: &Library, cmd: FavouritesCommand) -> anyhow::Result<()> {
    match cmd {
        FavouritesCommand::Add(args) => {
            let target = args.into_target()?;
            library.favourites().mark(&target).await?;
            println!("Favourited {} '{}'", target.kind_str(), target.name());
        }
        FavouritesCommand::Remove(args) => {
            let target = args.into_target()?;
            if library.favourites().unmark(&target).await? {
                println!("Removed favourite '{}'", target.name());
            } else {
                println!("'{}' was not a favourite", target.name());
            }
        }
        FavouritesCommand::List => {
            let resolved = library
                .coordinator()
                .resolve_marks(library.favourites(), library.playlists())
                .await?;
            print_targets(&resolved);
        }
    }
    Ok(())
}

async fn cmd_hidden(
    library: &Library,
    config: &config::Config,
    cmd: HiddenCommand,
) -> anyhow::Result<()> {
    match cmd {
        HiddenCommand::Hide(args) => {
            let target = args.into_target()?;
            library.hidden().hide(&target).await?;
            println!("Hid {} '{}'", target.kind_str(), target.name());
        }
        HiddenCommand::Unhide(args) => {
            let target = args.into_target()?;
            if library.hidden().unhide(&target).await? {
                println!("Unhid '{}'", target.name());
            } else {
                println!("'{}' was not hidden", target.name());
            }
        }
        HiddenCommand::List { secret } => {
            let Some(digest) = &config.access.hidden_secret_sha256 else {
                bail!("no hidden secret configured; run 'hidden set-secret' first");
            };
            let verifier = Sha256Verifier::new(digest.clone());
            let Some(token) = unlock(&verifier, &secret) else {
                bail!("wrong secret");
            };
            let resolved = library
                .coordinator()
                .resolve_hidden(library.hidden(), library.playlists(), token)
                .await?;
            print_targets(&resolved);
        }
        HiddenCommand::SetSecret { secret } => {
            let mut updated = config.clone();
            updated.access.hidden_secret_sha256 = Some(digest_hex(&secret));
            config::save(&updated)?;
            println!("Hidden secret updated");
        }
    }
    Ok(())
}

async fn cmd_playlist(library: &Library, cmd: PlaylistCommand) -> anyhow::Result<()> {
    match cmd {
        PlaylistCommand::Create { title } => {
            if library.create_playlist(&title).await? {
                println!("Created playlist '{title}'");
            } else {
                println!("Playlist '{title}' already exists");
            }
        }
        PlaylistCommand::Delete { title } => {
            library.playlists().delete(&title).await?;
            println!("Deleted playlist '{title}'");
        }
        PlaylistCommand::Rename { title, new_title } => {
            library.playlists().rename(&title, &new_title).await?;
            println!("Renamed '{title}' to '{new_title}'");
        }
        PlaylistCommand::AddTrack { title, path } => {
            library.playlists().add_track(&title, &path).await?;
            println!("Added '{path}' to '{title}'");
        }
        PlaylistCommand::RemoveTrack { title, path } => {
            if library.playlists().remove_track(&title, &path).await? {
                println!("Removed '{path}' from '{title}'");
            } else {
                println!("'{path}' was not in '{title}'");
            }
        }
        PlaylistCommand::Show { title } => {
            let playlist = library
                .coordinator()
                .resolve_playlist(library.playlists(), &title)
                .await?;
            println!("{} ({})", playlist.title, playlist.kind);
            for (i, track) in playlist.tracks.iter().enumerate() {
                println!("{:3}. {} - {}", i + 1, track.artist, track.title);
            }
        }
        PlaylistCommand::List => {
            for playlist in library.playlists().all().await? {
                println!("{}", playlist.title);
            }
        }
    }
    Ok(())
}

async fn cmd_stats(library: &Library, cmd: StatsCommand) -> anyhow::Result<()> {
    match cmd {
        StatsCommand::Show { kind, key } => {
            let kind = StatKind::parse(&kind)?;
            match library.statistics().get(kind, &key).await? {
                Some(record) => {
                    println!("{} ({})", record.key, record.kind.as_str());
                    println!("  all-time: {}", record.all_time);
                    println!("  yearly:   {} ({})", record.yearly, record.bucket_year);
                    println!(
                        "  monthly:  {} ({}-{:02})",
                        record.monthly, record.bucket_year, record.bucket_month
                    );
                    println!(
                        "  weekly:   {} ({}-W{:02})",
                        record.weekly, record.bucket_week_year, record.bucket_week
                    );
                    println!(
                        "  daily:    {} (day {} of {})",
                        record.daily, record.bucket_day, record.bucket_year
                    );
                }
                None => println!("No record for '{key}'"),
            }
        }
        StatsCommand::Top {
            kind,
            window,
            limit,
        } => {
            let kind = StatKind::parse(&kind)?;
            let window = StatWindow::parse(&window)?;
            let records = library.statistics().top(kind, window, limit).await?;
            for (i, record) in records.iter().enumerate() {
                println!("{:3}. {} ({})", i + 1, record.key, record.counter(window));
            }
        }
    }
    Ok(())
}

fn print_targets(targets: &[MarkTarget]) {
    for target in targets {
        match target {
            MarkTarget::Playlist { title, kind } => println!("playlist/{kind}: {title}"),
            MarkTarget::Artist { name } => println!("artist: {name}"),
        }
    }
    println!("{} entries", targets.len());
}
