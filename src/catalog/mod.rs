//! The external track catalog, as this crate observes it.
//!
//! The catalog is authoritative and read-only: derived views resolve their
//! natural keys against it but never write to it. [`CatalogSource`] is the
//! consumed interface; calls may be slow and are always made from a
//! background task.
//!
//! Two implementations ship here: [`SqliteCatalog`] reads the mirrored
//! `catalog_tracks` table (populated by [`replace_all`] during sync), and
//! [`MemoryCatalog`] serves a fixed track set for tests and embedding.

use crate::error::Result;
use crate::model::{Artist, Track};
use async_trait::async_trait;
use sqlx::SqlitePool;

/// Track query predicate. Exactly one axis at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrackFilter {
    /// Every track the catalog knows
    #[default]
    All,
    /// Tracks grouped under a container (album) name
    ByPlaylist(String),
    /// Tracks by one artist
    ByArtist(String),
    /// The single track at a path, if present
    ByPath(String),
}

/// Artist query predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArtistFilter {
    #[default]
    All,
    ByName(String),
}

/// Read-only view of the device's track catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List tracks matching the filter, in container order.
    async fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>>;

    /// List distinct artists matching the filter.
    async fn list_artists(&self, filter: &ArtistFilter) -> Result<Vec<Artist>>;
}

const TRACK_COLUMNS: &str =
    "id, title, artist, playlist_name, path, duration_ms, added_date, track_number";

/// Catalog backed by the mirrored `catalog_tracks` table.
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogSource for SqliteCatalog {
    async fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        let base = format!("SELECT {TRACK_COLUMNS} FROM catalog_tracks");
        let order = "ORDER BY playlist_name, track_number, path";
        let tracks = match filter {
            TrackFilter::All => {
                sqlx::query_as::<_, Track>(&format!("{base} {order}"))
                    .fetch_all(&self.pool)
                    .await?
            }
            TrackFilter::ByPlaylist(name) => {
                sqlx::query_as::<_, Track>(&format!(
                    "{base} WHERE playlist_name = ? {order}"
                ))
                .bind(name)
                .fetch_all(&self.pool)
                .await?
            }
            TrackFilter::ByArtist(name) => {
                sqlx::query_as::<_, Track>(&format!("{base} WHERE artist = ? {order}"))
                    .bind(name)
                    .fetch_all(&self.pool)
                    .await?
            }
            TrackFilter::ByPath(path) => {
                sqlx::query_as::<_, Track>(&format!("{base} WHERE path = ?"))
                    .bind(path)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(tracks)
    }

    async fn list_artists(&self, filter: &ArtistFilter) -> Result<Vec<Artist>> {
        let artists = match filter {
            ArtistFilter::All => {
                sqlx::query_as::<_, Artist>(
                    "SELECT DISTINCT artist AS name FROM catalog_tracks ORDER BY artist",
                )
                .fetch_all(&self.pool)
                .await?
            }
            ArtistFilter::ByName(name) => {
                sqlx::query_as::<_, Artist>(
                    "SELECT DISTINCT artist AS name FROM catalog_tracks WHERE artist = ?",
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(artists)
    }
}

/// Replace the mirrored catalog with a fresh snapshot, atomically.
///
/// Readers concurrent with the swap observe either the old or the new
/// snapshot, never a mix.
pub async fn replace_all(pool: &SqlitePool, tracks: &[Track]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM catalog_tracks")
        .execute(&mut *tx)
        .await?;

    for track in tracks {
        sqlx::query(
            "INSERT INTO catalog_tracks \
             (id, title, artist, playlist_name, path, duration_ms, added_date, track_number) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(track.id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.playlist_name)
        .bind(&track.path)
        .bind(track.duration_ms)
        .bind(track.added_date)
        .bind(track.track_number)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(tracks = tracks.len(), "Replaced catalog mirror");
    Ok(())
}

/// Fixed in-memory catalog for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tracks: Vec<Track>,
}

impl MemoryCatalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        let matches = |t: &Track| match filter {
            TrackFilter::All => true,
            TrackFilter::ByPlaylist(name) => &t.playlist_name == name,
            TrackFilter::ByArtist(name) => &t.artist == name,
            TrackFilter::ByPath(path) => &t.path == path,
        };
        Ok(self.tracks.iter().filter(|t| matches(t)).cloned().collect())
    }

    async fn list_artists(&self, filter: &ArtistFilter) -> Result<Vec<Artist>> {
        let mut names: Vec<&str> = self
            .tracks
            .iter()
            .map(|t| t.artist.as_str())
            .filter(|name| match filter {
                ArtistFilter::All => true,
                ArtistFilter::ByName(n) => name == n,
            })
            .collect();
        names.sort_unstable();
        names.dedup();
        Ok(names
            .into_iter()
            .map(|name| Artist { name: name.into() })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_track, temp_db};

    #[tokio::test]
    async fn test_replace_all_and_list() {
        let (pool, _dir) = temp_db().await;
        let catalog = SqliteCatalog::new(pool.clone());

        let tracks = vec![
            mock_track("/m/a.mp3", "Alpha", "Ana", "First"),
            mock_track("/m/b.mp3", "Beta", "Bob", "First"),
            mock_track("/m/c.mp3", "Gamma", "Ana", "Second"),
        ];
        replace_all(&pool, &tracks).await.unwrap();

        let all = catalog.list_tracks(&TrackFilter::All).await.unwrap();
        assert_eq!(all.len(), 3);

        let first = catalog
            .list_tracks(&TrackFilter::ByPlaylist("First".into()))
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        let ana = catalog
            .list_tracks(&TrackFilter::ByArtist("Ana".into()))
            .await
            .unwrap();
        assert_eq!(ana.len(), 2);

        let by_path = catalog
            .list_tracks(&TrackFilter::ByPath("/m/b.mp3".into()))
            .await
            .unwrap();
        assert_eq!(by_path.len(), 1);
        assert_eq!(by_path[0].title, "Beta");
    }

    #[tokio::test]
    async fn test_replace_all_swaps_snapshot() {
        let (pool, _dir) = temp_db().await;
        let catalog = SqliteCatalog::new(pool.clone());

        replace_all(&pool, &[mock_track("/m/a.mp3", "Alpha", "Ana", "First")])
            .await
            .unwrap();
        replace_all(&pool, &[mock_track("/m/z.mp3", "Zeta", "Zoe", "Last")])
            .await
            .unwrap();

        let all = catalog.list_tracks(&TrackFilter::All).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path, "/m/z.mp3");
    }

    #[tokio::test]
    async fn test_sqlite_list_artists_distinct() {
        let (pool, _dir) = temp_db().await;
        let catalog = SqliteCatalog::new(pool.clone());

        replace_all(
            &pool,
            &[
                mock_track("/m/a.mp3", "Alpha", "Ana", "First"),
                mock_track("/m/b.mp3", "Beta", "Ana", "First"),
                mock_track("/m/c.mp3", "Gamma", "Bob", "Second"),
            ],
        )
        .await
        .unwrap();

        let artists = catalog.list_artists(&ArtistFilter::All).await.unwrap();
        let names: Vec<_> = artists.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bob"]);
    }

    #[tokio::test]
    async fn test_memory_catalog_filters() {
        let catalog = MemoryCatalog::new(vec![
            mock_track("/m/a.mp3", "Alpha", "Ana", "First"),
            mock_track("/m/b.mp3", "Beta", "Bob", "Second"),
        ]);

        let by_artist = catalog
            .list_tracks(&TrackFilter::ByArtist("Bob".into()))
            .await
            .unwrap();
        assert_eq!(by_artist.len(), 1);

        let artists = catalog
            .list_artists(&ArtistFilter::ByName("Ana".into()))
            .await
            .unwrap();
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].name, "Ana");
    }
}
