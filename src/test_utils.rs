//! Test utilities and fixtures for tune-keeper tests.
//!
//! Common helpers and mock factories to reduce boilerplate in tests.

use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

use crate::catalog::MemoryCatalog;
use crate::model::Track;
use crate::repo::Library;

/// Creates a temporary database for testing.
///
/// The database lives in a temporary directory that is cleaned up when the
/// returned `TempDir` is dropped; keep it alive for the duration of the
/// test. Migrations are run automatically.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Creates a [`Track`] with the given identity fields and sensible
/// defaults for the rest.
pub fn mock_track(path: &str, title: &str, artist: &str, playlist_name: &str) -> Track {
    Track {
        id: 1,
        title: title.to_string(),
        artist: artist.to_string(),
        playlist_name: playlist_name.to_string(),
        path: path.to_string(),
        duration_ms: Some(180_000),
        added_date: Some(1_700_000_000),
        track_number: Some(1),
    }
}

/// Creates a full [`Library`] over a temporary database and an in-memory
/// catalog seeded with the given tracks.
pub async fn test_library(tracks: Vec<Track>) -> (Arc<Library>, TempDir) {
    let (pool, dir) = temp_db().await;
    let catalog = Arc::new(MemoryCatalog::new(tracks));
    (Library::open(pool, catalog, true), dir)
}
