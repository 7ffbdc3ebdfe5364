//! Keeps derived views truthful against the catalog.
//!
//! On load of a view, every entry is resolved against a single catalog
//! snapshot; entries whose referenced track, container, or artist no longer
//! exists are dropped from the result. Durable rows are NOT deleted as part
//! of the read. Pruning is opportunistic: a background task removes the
//! stale rows best-effort, and a failure there only means the rows get
//! dropped again on the next load.

use crate::access::AccessToken;
use crate::catalog::{CatalogSource, TrackFilter};
use crate::error::{Error, Result};
use crate::model::{MarkTarget, Playlist, PlaylistKind, Track};
use crate::repo::{HiddenRepo, MarkRepo, PlaylistsRepo};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// One catalog read, indexed for membership checks.
struct CatalogSnapshot {
    playlist_names: HashSet<String>,
    artist_names: HashSet<String>,
    tracks_by_path: HashMap<String, Track>,
}

impl CatalogSnapshot {
    fn index(tracks: Vec<Track>) -> Self {
        let mut playlist_names = HashSet::new();
        let mut artist_names = HashSet::new();
        let mut tracks_by_path = HashMap::new();
        for track in tracks {
            playlist_names.insert(track.playlist_name.clone());
            artist_names.insert(track.artist.clone());
            tracks_by_path.insert(track.path.clone(), track);
        }
        Self {
            playlist_names,
            artist_names,
            tracks_by_path,
        }
    }
}

/// Reconciles derived views against the catalog source.
#[derive(Clone)]
pub struct Coordinator {
    catalog: Arc<dyn CatalogSource>,
    prune_stale: bool,
}

impl Coordinator {
    pub fn new(catalog: Arc<dyn CatalogSource>, prune_stale: bool) -> Self {
        Self {
            catalog,
            prune_stale,
        }
    }

    async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let tracks = self.catalog.list_tracks(&TrackFilter::All).await?;
        Ok(CatalogSnapshot::index(tracks))
    }

    /// Resolve a mark view (favourites) against the catalog, returning only
    /// live entries. Custom-playlist targets resolve against the playlists
    /// repository, which owns them; everything else resolves against the
    /// catalog snapshot.
    pub async fn resolve_marks(
        &self,
        marks: &MarkRepo,
        playlists: &PlaylistsRepo,
    ) -> Result<Vec<MarkTarget>> {
        let entries = marks.all().await?;
        let snapshot = self.snapshot().await?;

        let mut live = Vec::with_capacity(entries.len());
        let mut stale = Vec::new();
        for entry in entries {
            let resolved = match &entry {
                MarkTarget::Playlist {
                    title,
                    kind: PlaylistKind::Custom,
                } => playlists.contains(title).await?,
                MarkTarget::Playlist { title, .. } => snapshot.playlist_names.contains(title),
                MarkTarget::Artist { name } => snapshot.artist_names.contains(name),
            };
            if resolved {
                live.push(entry);
            } else {
                stale.push(entry);
            }
        }

        self.prune_marks(marks, stale);
        Ok(live)
    }

    /// Resolve the hidden view. Requires the same access proof as reading
    /// the raw hidden set.
    pub async fn resolve_hidden(
        &self,
        hidden: &HiddenRepo,
        playlists: &PlaylistsRepo,
        _token: AccessToken,
    ) -> Result<Vec<MarkTarget>> {
        self.resolve_marks(hidden.store(), playlists).await
    }

    /// Resolve favourites and hidden in one pass over two concurrent loads.
    pub async fn resolve_views(
        &self,
        favourites: &MarkRepo,
        hidden: &HiddenRepo,
        playlists: &PlaylistsRepo,
        token: AccessToken,
    ) -> Result<(Vec<MarkTarget>, Vec<MarkTarget>)> {
        futures::future::try_join(
            self.resolve_marks(favourites, playlists),
            self.resolve_hidden(hidden, playlists, token),
        )
        .await
    }

    /// Resolve a custom playlist's membership into tracks, in curated
    /// order. Paths the catalog no longer knows are dropped (and pruned
    /// opportunistically).
    pub async fn resolve_playlist_tracks(
        &self,
        playlists: &PlaylistsRepo,
        title: &str,
    ) -> Result<Vec<Track>> {
        let paths = playlists.track_paths(title).await?;
        let snapshot = self.snapshot().await?;

        let mut live = Vec::with_capacity(paths.len());
        let mut stale = Vec::new();
        for path in paths {
            match snapshot.tracks_by_path.get(&path) {
                Some(track) => live.push(track.clone()),
                None => stale.push(path),
            }
        }

        if self.prune_stale && !stale.is_empty() {
            let playlists = playlists.clone();
            let title = title.to_string();
            tokio::spawn(async move {
                match playlists.remove_tracks(&title, &stale).await {
                    Ok(removed) => {
                        debug!(playlist = %title, removed, "Pruned stale playlist members")
                    }
                    Err(e) => warn!(playlist = %title, error = %e, "Stale-member pruning failed"),
                }
            });
        }

        Ok(live)
    }

    /// Resolve a custom playlist into its full [`Playlist`] shape: title,
    /// kind, and live tracks in curated order.
    pub async fn resolve_playlist(
        &self,
        playlists: &PlaylistsRepo,
        title: &str,
    ) -> Result<Playlist> {
        if !playlists.contains(title).await? {
            return Err(Error::not_found("playlist", title));
        }
        let tracks = self.resolve_playlist_tracks(playlists, title).await?;
        Ok(Playlist {
            title: title.to_string(),
            kind: PlaylistKind::Custom,
            tracks,
        })
    }

    fn prune_marks(&self, marks: &MarkRepo, stale: Vec<MarkTarget>) {
        if !self.prune_stale || stale.is_empty() {
            return;
        }
        let marks = marks.clone();
        tokio::spawn(async move {
            match marks.remove_many(&stale).await {
                Ok(removed) => debug!(removed, "Pruned stale marks"),
                Err(e) => warn!(error = %e, "Stale-mark pruning failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Sha256Verifier, unlock};
    use crate::catalog::MemoryCatalog;
    use crate::test_utils::{mock_track, temp_db};
    use std::time::Duration;

    fn catalog() -> Arc<dyn CatalogSource> {
        Arc::new(MemoryCatalog::new(vec![
            mock_track("/m/a.mp3", "Alpha", "Ana", "First Album"),
            mock_track("/m/b.mp3", "Beta", "Bob", "First Album"),
            mock_track("/m/c.mp3", "Gamma", "Ana", "Second Album"),
        ]))
    }

    #[tokio::test]
    async fn test_stale_favourite_is_excluded_without_error() {
        let (pool, _dir) = temp_db().await;
        let marks = MarkRepo::new(pool.clone(), "favourites");
        let playlists = PlaylistsRepo::new(pool);
        let coordinator = Coordinator::new(catalog(), false);

        let live = MarkTarget::playlist("First Album", PlaylistKind::Album);
        let stale = MarkTarget::playlist("Vanished Album", PlaylistKind::Album);
        marks.mark(&live).await.unwrap();
        marks.mark(&stale).await.unwrap();

        let resolved = coordinator.resolve_marks(&marks, &playlists).await.unwrap();
        assert_eq!(resolved, vec![live]);

        // Pruning disabled: the durable row survives for the next load
        assert_eq!(marks.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_marks_are_pruned_opportunistically() {
        let (pool, _dir) = temp_db().await;
        let marks = MarkRepo::new(pool.clone(), "favourites");
        let playlists = PlaylistsRepo::new(pool);
        let coordinator = Coordinator::new(catalog(), true);

        marks.mark(&MarkTarget::artist("Ana")).await.unwrap();
        marks
            .mark(&MarkTarget::artist("Forgotten"))
            .await
            .unwrap();

        let resolved = coordinator.resolve_marks(&marks, &playlists).await.unwrap();
        assert_eq!(resolved, vec![MarkTarget::artist("Ana")]);

        // The spawned prune task runs best-effort; poll for it
        for _ in 0..100 {
            if marks.all().await.unwrap().len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(marks.all().await.unwrap(), vec![MarkTarget::artist("Ana")]);
    }

    #[tokio::test]
    async fn test_custom_playlist_mark_resolves_against_playlists_repo() {
        let (pool, _dir) = temp_db().await;
        let marks = MarkRepo::new(pool.clone(), "favourites");
        let playlists = PlaylistsRepo::new(pool);
        let coordinator = Coordinator::new(catalog(), false);

        playlists.create("My Mix").await.unwrap();
        let custom_live = MarkTarget::playlist("My Mix", PlaylistKind::Custom);
        let custom_stale = MarkTarget::playlist("Deleted Mix", PlaylistKind::Custom);
        marks.mark(&custom_live).await.unwrap();
        marks.mark(&custom_stale).await.unwrap();

        let resolved = coordinator.resolve_marks(&marks, &playlists).await.unwrap();
        assert_eq!(resolved, vec![custom_live]);
    }

    #[tokio::test]
    async fn test_resolve_playlist_tracks_keeps_curated_order() {
        let (pool, _dir) = temp_db().await;
        let playlists = PlaylistsRepo::new(pool);
        let coordinator = Coordinator::new(catalog(), false);

        playlists.create("Road Trip").await.unwrap();
        playlists.add_track("Road Trip", "/m/c.mp3").await.unwrap();
        playlists.add_track("Road Trip", "/m/gone.mp3").await.unwrap();
        playlists.add_track("Road Trip", "/m/a.mp3").await.unwrap();

        let tracks = coordinator
            .resolve_playlist_tracks(&playlists, "Road Trip")
            .await
            .unwrap();
        let paths: Vec<_> = tracks.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(paths, vec!["/m/c.mp3", "/m/a.mp3"]);
    }

    #[tokio::test]
    async fn test_resolve_playlist_returns_full_shape() {
        let (pool, _dir) = temp_db().await;
        let playlists = PlaylistsRepo::new(pool);
        let coordinator = Coordinator::new(catalog(), false);

        playlists.create("Road Trip").await.unwrap();
        playlists.add_track("Road Trip", "/m/b.mp3").await.unwrap();
        playlists.add_track("Road Trip", "/m/a.mp3").await.unwrap();

        let playlist = coordinator
            .resolve_playlist(&playlists, "Road Trip")
            .await
            .unwrap();
        assert_eq!(playlist.title, "Road Trip");
        assert_eq!(playlist.kind, PlaylistKind::Custom);
        let paths: Vec<_> = playlist.tracks.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(paths, vec!["/m/b.mp3", "/m/a.mp3"]);

        let err = coordinator
            .resolve_playlist(&playlists, "Nope")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_views_joins_both_sets() {
        let (pool, _dir) = temp_db().await;
        let favourites = MarkRepo::new(pool.clone(), "favourites");
        let hidden = HiddenRepo::new(pool.clone());
        let playlists = PlaylistsRepo::new(pool);
        let coordinator = Coordinator::new(catalog(), false);

        favourites.mark(&MarkTarget::artist("Ana")).await.unwrap();
        hidden.hide(&MarkTarget::artist("Bob")).await.unwrap();
        hidden.hide(&MarkTarget::artist("Nobody")).await.unwrap();

        let verifier = Sha256Verifier::from_secret("pw");
        let token = unlock(&verifier, "pw").unwrap();
        let (fav, hid) = coordinator
            .resolve_views(&favourites, &hidden, &playlists, token)
            .await
            .unwrap();

        assert_eq!(fav, vec![MarkTarget::artist("Ana")]);
        assert_eq!(hid, vec![MarkTarget::artist("Bob")]);
    }
}
