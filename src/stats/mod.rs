//! Time-bucketed play-count statistics.
//!
//! Every play (and every playlist creation) increments five counters for its
//! key. `all_time` accumulates forever; the four windowed counters reset
//! when the calendar period they were last updated in has passed. Rollover
//! never catches up missed periods: after a three-week gap the weekly
//! counter resets once and the next play lands it at 1, not at anything
//! accounting for the skipped weeks.
//!
//! The whole load-apply-persist runs inside
//! [`StatisticsRepo::mutate`](crate::repo::StatisticsRepo::mutate), so
//! concurrent events for one key serialize while different keys proceed in
//! parallel.

use crate::error::Result;
use crate::model::{StatKind, StatisticsRecord};
use crate::repo::StatisticsRepo;
use chrono::{DateTime, Datelike, Utc};
use tokio::task::JoinHandle;
use tracing::error;

/// Key of the process-wide playlist-creation counter.
pub const PLAYLIST_CREATED_KEY: &str = "playlists:created";

/// The calendar periods an instant falls into, one per windowed counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBuckets {
    /// Calendar year
    pub year: i32,
    /// Month of year (1-12)
    pub month: u32,
    /// ISO week-year; pairs with `week` so the week spanning New Year
    /// compares correctly
    pub week_year: i32,
    /// ISO week number
    pub week: u32,
    /// Day of year (1-366)
    pub day: u32,
}

impl TimeBuckets {
    /// The buckets an instant falls into.
    pub fn at(instant: DateTime<Utc>) -> Self {
        let iso = instant.iso_week();
        Self {
            year: instant.year(),
            month: instant.month(),
            week_year: iso.year(),
            week: iso.week(),
            day: instant.ordinal(),
        }
    }
}

/// Apply one play/creation event to a record, rolling windows over as
/// needed. Pure; the repository mutation provides atomicity.
///
/// Each windowed counter independently resets to 0 when its stored bucket
/// differs from `now`, then increments by one. `all_time` increments
/// unconditionally and never resets.
pub fn apply_event(
    existing: Option<StatisticsRecord>,
    key: &str,
    kind: StatKind,
    now: TimeBuckets,
) -> StatisticsRecord {
    let mut record = existing.unwrap_or(StatisticsRecord {
        key: key.to_string(),
        kind,
        all_time: 0,
        yearly: 0,
        monthly: 0,
        weekly: 0,
        daily: 0,
        bucket_year: now.year,
        bucket_month: now.month,
        bucket_week_year: now.week_year,
        bucket_week: now.week,
        bucket_day: now.day,
    });

    if record.bucket_year != now.year {
        record.yearly = 0;
    }
    if (record.bucket_year, record.bucket_month) != (now.year, now.month) {
        record.monthly = 0;
    }
    if (record.bucket_week_year, record.bucket_week) != (now.week_year, now.week) {
        record.weekly = 0;
    }
    if (record.bucket_year, record.bucket_day) != (now.year, now.day) {
        record.daily = 0;
    }

    record.all_time += 1;
    record.yearly += 1;
    record.monthly += 1;
    record.weekly += 1;
    record.daily += 1;

    record.bucket_year = now.year;
    record.bucket_month = now.month;
    record.bucket_week_year = now.week_year;
    record.bucket_week = now.week;
    record.bucket_day = now.day;

    record
}

/// Statistics engine: the awaitable event surface.
#[derive(Clone)]
pub struct StatsEngine {
    repo: StatisticsRepo,
}

impl StatsEngine {
    pub fn new(repo: StatisticsRepo) -> Self {
        Self { repo }
    }

    /// Record a play of the track at `path`.
    pub async fn record_play(&self, path: &str) -> Result<StatisticsRecord> {
        self.record_at(StatKind::Track, path, Utc::now()).await
    }

    /// Record a play attributed to an artist.
    pub async fn record_artist_play(&self, artist: &str) -> Result<StatisticsRecord> {
        self.record_at(StatKind::Artist, artist, Utc::now()).await
    }

    /// Record a playlist creation against the process-wide counter.
    pub async fn record_playlist_created(&self) -> Result<StatisticsRecord> {
        self.record_at(StatKind::Global, PLAYLIST_CREATED_KEY, Utc::now())
            .await
    }

    /// Record an event at an explicit instant. Exposed for callers (and
    /// tests) that replay history.
    pub async fn record_at(
        &self,
        kind: StatKind,
        key: &str,
        instant: DateTime<Utc>,
    ) -> Result<StatisticsRecord> {
        let buckets = TimeBuckets::at(instant);
        let owned_key = key.to_string();
        self.repo
            .mutate(kind, key, move |existing| {
                apply_event(existing, &owned_key, kind, buckets)
            })
            .await
    }
}

/// Fire-and-forget event surface.
///
/// Each call spawns the mutation as an independent task: callers that care
/// about the outcome can await the returned handle, callers that don't may
/// drop it. The task still runs to completion, and a failure is logged
/// rather than swallowed.
#[derive(Clone)]
pub struct StatsEvents {
    engine: StatsEngine,
}

impl StatsEvents {
    pub fn new(engine: StatsEngine) -> Self {
        Self { engine }
    }

    /// Fire a track-play event.
    pub fn record_play(&self, path: &str) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            if let Err(e) = engine.record_play(&path).await {
                error!(track = %path, error = %e, "Failed to record play");
            }
        })
    }

    /// Fire an artist-play event.
    pub fn record_artist_play(&self, artist: &str) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let artist = artist.to_string();
        tokio::spawn(async move {
            if let Err(e) = engine.record_artist_play(&artist).await {
                error!(artist = %artist, error = %e, "Failed to record artist play");
            }
        })
    }

    /// Fire a playlist-created event.
    pub fn record_playlist_created(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.record_playlist_created().await {
                error!(error = %e, "Failed to record playlist creation");
            }
        })
    }
}
