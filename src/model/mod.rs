//! Core data models for the library index.
//!
//! [`Track`] and [`Artist`] are read-only projections of the external
//! catalog; the index never creates or destroys them, only observes them as
//! present or absent. [`MarkTarget`] and [`StatisticsRecord`] are the rows
//! the derived views own.
//!
//! Playlist variants are a tagged enum ([`PlaylistKind`]) rather than a type
//! hierarchy; per-variant behavior is dispatched by exhaustive matching.

use crate::error::{Error, Result};
use sqlx::FromRow;

/// A track as known to the external catalog.
///
/// The `path` is the unique natural key; no two tracks share a path.
/// Derived views store the path, not a copy of the track.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Track {
    /// Stable numeric id assigned by the catalog
    pub id: i64,
    /// Track title
    pub title: String,
    /// Artist name
    pub artist: String,
    /// Album/container name the catalog groups this track under
    pub playlist_name: String,
    /// Absolute file path (unique natural key)
    pub path: String,
    /// Duration in milliseconds
    pub duration_ms: Option<i64>,
    /// Unix timestamp the track was added to the catalog
    pub added_date: Option<i64>,
    /// Position within its container
    pub track_number: Option<i64>,
}

/// An artist, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Artist {
    /// Artist name (natural key)
    pub name: String,
}

/// Playlist variants.
///
/// `Album` and `GuessTheMelody` are unordered groupings by container name,
/// derived from the catalog. `Custom` is an explicitly ordered, user-curated
/// sequence whose membership rows the playlists repository owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaylistKind {
    Album,
    Custom,
    GuessTheMelody,
}

impl PlaylistKind {
    /// Stable text encoding used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Custom => "custom",
            Self::GuessTheMelody => "guess_the_melody",
        }
    }

    /// Parse the storage encoding back into a variant.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "album" => Ok(Self::Album),
            "custom" => Ok(Self::Custom),
            "guess_the_melody" => Ok(Self::GuessTheMelody),
            other => Err(Error::invariant(format!(
                "unknown playlist kind '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for PlaylistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A playlist with its resolved tracks.
///
/// Track order is meaningful only for [`PlaylistKind::Custom`].
#[derive(Debug, Clone)]
pub struct Playlist {
    pub title: String,
    pub kind: PlaylistKind,
    pub tracks: Vec<Track>,
}

/// A user-created playlist row, before membership resolution.
#[derive(Debug, Clone, FromRow)]
pub struct CustomPlaylist {
    pub title: String,
    /// Unix timestamp of creation
    pub created_at: i64,
}

/// What a favourite or hidden entry points at.
///
/// The entry is a set membership: the referenced playlist or artist lives in
/// the catalog (or the custom-playlists repository), not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkTarget {
    Playlist { title: String, kind: PlaylistKind },
    Artist { name: String },
}

impl MarkTarget {
    pub fn playlist(title: impl Into<String>, kind: PlaylistKind) -> Self {
        Self::Playlist {
            title: title.into(),
            kind,
        }
    }

    pub fn artist(name: impl Into<String>) -> Self {
        Self::Artist { name: name.into() }
    }

    /// The natural key of the referenced entity.
    pub fn name(&self) -> &str {
        match self {
            Self::Playlist { title, .. } => title,
            Self::Artist { name } => name,
        }
    }

    /// Storage discriminator for the target kind column.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Playlist { .. } => "playlist",
            Self::Artist { .. } => "artist",
        }
    }

    /// Storage value for the playlist kind column (NULL for artists).
    pub fn playlist_kind_str(&self) -> Option<&'static str> {
        match self {
            Self::Playlist { kind, .. } => Some(kind.as_str()),
            Self::Artist { .. } => None,
        }
    }

    /// Reassemble a target from its storage columns.
    pub fn from_columns(
        target_kind: &str,
        name: String,
        playlist_kind: Option<&str>,
    ) -> Result<Self> {
        match target_kind {
            "playlist" => {
                let kind = playlist_kind
                    .ok_or_else(|| Error::invariant("playlist mark without a playlist kind"))?;
                Ok(Self::Playlist {
                    title: name,
                    kind: PlaylistKind::parse(kind)?,
                })
            }
            "artist" => Ok(Self::Artist { name }),
            other => Err(Error::invariant(format!("unknown mark target '{other}'"))),
        }
    }
}

/// What kind of entity a statistics record counts plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// Keyed by track path
    Track,
    /// Keyed by artist name
    Artist,
    /// A single process-wide counter (playlist creations)
    Global,
}

impl StatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Artist => "artist",
            Self::Global => "global",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "track" => Ok(Self::Track),
            "artist" => Ok(Self::Artist),
            "global" => Ok(Self::Global),
            other => Err(Error::invariant(format!("unknown stat kind '{other}'"))),
        }
    }
}

/// Rolling play-count record for one key.
///
/// The four windowed counters each carry the calendar bucket they were last
/// updated in; `all_time` has no bucket and never resets. Immediately after
/// any update, every counter is non-negative and `all_time` is at least as
/// large as each windowed counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsRecord {
    pub key: String,
    pub kind: StatKind,
    pub all_time: i64,
    pub yearly: i64,
    pub monthly: i64,
    pub weekly: i64,
    pub daily: i64,
    /// Calendar year of the last update
    pub bucket_year: i32,
    /// Month of year (1-12) of the last update
    pub bucket_month: u32,
    /// ISO week-year of the last update (differs from `bucket_year` around
    /// New Year)
    pub bucket_week_year: i32,
    /// ISO week number of the last update
    pub bucket_week: u32,
    /// Day of year (1-366) of the last update
    pub bucket_day: u32,
}

/// One of the five rolling counter windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatWindow {
    AllTime,
    Yearly,
    Monthly,
    Weekly,
    Daily,
}

impl StatWindow {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "all-time" | "all_time" => Ok(Self::AllTime),
            "yearly" => Ok(Self::Yearly),
            "monthly" => Ok(Self::Monthly),
            "weekly" => Ok(Self::Weekly),
            "daily" => Ok(Self::Daily),
            other => Err(Error::invariant(format!("unknown stat window '{other}'"))),
        }
    }

    /// Column that stores this window's counter.
    pub fn column(self) -> &'static str {
        match self {
            Self::AllTime => "all_time",
            Self::Yearly => "yearly",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
            Self::Daily => "daily",
        }
    }
}

impl StatisticsRecord {
    /// The counter value for a window.
    pub fn counter(&self, window: StatWindow) -> i64 {
        match window {
            StatWindow::AllTime => self.all_time,
            StatWindow::Yearly => self.yearly,
            StatWindow::Monthly => self.monthly,
            StatWindow::Weekly => self.weekly,
            StatWindow::Daily => self.daily,
        }
    }
}
