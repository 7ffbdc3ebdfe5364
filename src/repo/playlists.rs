//! User-curated custom playlists and their membership rows.
//!
//! Membership rows are exclusively owned by their playlist (many-to-one);
//! deleting a playlist cascades through its rows inside one transaction, so
//! concurrent readers see the playlist with all of its tracks or neither.
//! Track references are stored by path, the catalog's natural key.

use crate::error::{Error, Result};
use crate::model::CustomPlaylist;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Repository over `custom_playlists` and `custom_playlist_tracks`.
#[derive(Clone)]
pub struct PlaylistsRepo {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl PlaylistsRepo {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Create a playlist. Returns `false` if one with this title already
    /// exists (no-op).
    pub async fn create(&self, title: &str) -> Result<bool> {
        let _guard = self.write_gate.lock().await;
        let result = sqlx::query(
            "INSERT INTO custom_playlists (title, created_at) VALUES (?, ?) \
             ON CONFLICT DO NOTHING",
        )
        .bind(title)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a playlist and every membership row it owns, atomically.
    ///
    /// Rows of other playlists are untouched. Deleting an unknown playlist
    /// is [`Error::NotFound`]; the store is left unchanged.
    pub async fn delete(&self, title: &str) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM custom_playlist_tracks WHERE playlist_title = ?")
            .bind(title)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM custom_playlists WHERE title = ?")
            .bind(title)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Dropping tx rolls the membership delete back
            return Err(Error::not_found("playlist", title));
        }

        tx.commit().await?;
        tracing::debug!(playlist = title, "Deleted custom playlist");
        Ok(())
    }

    /// Rename a playlist, carrying its membership rows along.
    pub async fn rename(&self, old_title: &str, new_title: &str) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let taken: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM custom_playlists WHERE title = ?")
                .bind(new_title)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(Error::invariant(format!(
                "playlist '{new_title}' already exists"
            )));
        }

        let result = sqlx::query("UPDATE custom_playlists SET title = ? WHERE title = ?")
            .bind(new_title)
            .bind(old_title)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("playlist", old_title));
        }

        sqlx::query("UPDATE custom_playlist_tracks SET playlist_title = ? WHERE playlist_title = ?")
            .bind(new_title)
            .bind(old_title)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Append a track to a playlist. Re-adding a member is a no-op success.
    pub async fn add_track(&self, title: &str, track_path: &str) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM custom_playlists WHERE title = ?")
                .bind(title)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(Error::not_found("playlist", title));
        }

        sqlx::query(
            "INSERT INTO custom_playlist_tracks (playlist_title, track_path, position) \
             SELECT ?, ?, COALESCE(MAX(position) + 1, 0) \
             FROM custom_playlist_tracks WHERE playlist_title = ? \
             ON CONFLICT DO NOTHING",
        )
        .bind(title)
        .bind(track_path)
        .bind(title)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a track from a playlist. Returns whether a row was removed.
    pub async fn remove_track(&self, title: &str, track_path: &str) -> Result<bool> {
        let _guard = self.write_gate.lock().await;
        let result = sqlx::query(
            "DELETE FROM custom_playlist_tracks WHERE playlist_title = ? AND track_path = ?",
        )
        .bind(title)
        .bind(track_path)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove several tracks in one atomic mutation (lazy pruning path).
    pub async fn remove_tracks(&self, title: &str, track_paths: &[String]) -> Result<u64> {
        if track_paths.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for path in track_paths {
            let result = sqlx::query(
                "DELETE FROM custom_playlist_tracks WHERE playlist_title = ? AND track_path = ?",
            )
            .bind(title)
            .bind(path)
            .execute(&mut *tx)
            .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// The playlist's track paths in curated order.
    pub async fn track_paths(&self, title: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT track_path FROM custom_playlist_tracks \
             WHERE playlist_title = ? ORDER BY position",
        )
        .bind(title)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(path,)| path).collect())
    }

    /// All custom playlists, oldest first.
    pub async fn all(&self) -> Result<Vec<CustomPlaylist>> {
        let playlists = sqlx::query_as::<_, CustomPlaylist>(
            "SELECT title, created_at FROM custom_playlists ORDER BY created_at, title",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(playlists)
    }

    /// Whether a playlist with this title exists.
    pub async fn contains(&self, title: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM custom_playlists WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
