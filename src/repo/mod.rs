//! Synchronized repositories over the derived views.
//!
//! One repository instance exists per derived-view kind (favourites, hidden,
//! custom playlists, statistics) for the process lifetime; [`Library`] owns
//! all four plus the catalog handle. Every repository follows the same
//! pattern: a shared `SqlitePool` for reads, and a `tokio::sync::Mutex`
//! write gate that serializes mutations. A mutation holds the gate for its
//! whole read-modify-write and commits in one transaction, so concurrent
//! callers never interleave and readers observe pre- or post-state only.
//!
//! Cancelling a caller can only take effect at an await point; a transaction
//! dropped before commit rolls back, a committed one is durable; there is
//! no partial state either way.

mod hidden;
mod marks;
mod playlists;
mod statistics;

pub use hidden::HiddenRepo;
pub use marks::MarkRepo;
pub use playlists::PlaylistsRepo;
pub use statistics::StatisticsRepo;

use crate::catalog::{CatalogSource, SqliteCatalog};
use crate::config::Config;
use crate::consistency::Coordinator;
use crate::db;
use crate::error::Result;
use crate::stats::{StatsEngine, StatsEvents};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::OnceCell;

static SHARED: OnceCell<Arc<Library>> = OnceCell::const_new();

/// The library index: catalog handle plus one repository per derived view.
///
/// Constructed once and passed around by `Arc`; [`Library::shared`] provides
/// the process-wide instance for callers without an injected one.
pub struct Library {
    pool: SqlitePool,
    catalog: Arc<dyn CatalogSource>,
    favourites: MarkRepo,
    hidden: HiddenRepo,
    playlists: PlaylistsRepo,
    statistics: StatisticsRepo,
    prune_stale: bool,
}

impl Library {
    /// Construct a library over an initialized pool and a catalog handle.
    ///
    /// This is the injectable path: tests and embedders call it directly
    /// with their own catalog implementation.
    pub fn open(pool: SqlitePool, catalog: Arc<dyn CatalogSource>, prune_stale: bool) -> Arc<Self> {
        Arc::new(Self {
            favourites: MarkRepo::new(pool.clone(), "favourites"),
            hidden: HiddenRepo::new(pool.clone()),
            playlists: PlaylistsRepo::new(pool.clone()),
            statistics: StatisticsRepo::new(pool.clone()),
            pool,
            catalog,
            prune_stale,
        })
    }

    /// The process-wide library instance, constructed on first use.
    ///
    /// Concurrent first calls race safely: the `OnceCell` runs one
    /// initializer and every caller gets the same `Arc`. A failed
    /// initialization leaves the cell empty so a later call can retry.
    pub async fn shared(config: &Config) -> Result<Arc<Library>> {
        Self::shared_in(&SHARED, config).await
    }

    pub(crate) async fn shared_in(
        cell: &OnceCell<Arc<Library>>,
        config: &Config,
    ) -> Result<Arc<Library>> {
        cell.get_or_try_init(|| async {
            let url = db::db_url(config.database.path.as_deref());
            let pool = db::init_db(&url).await?;
            let catalog = Arc::new(SqliteCatalog::new(pool.clone()));
            tracing::info!(db = %url, "Opened library");
            Ok(Self::open(pool, catalog, config.consistency.prune_stale))
        })
        .await
        .cloned()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogSource> {
        &self.catalog
    }

    pub fn favourites(&self) -> &MarkRepo {
        &self.favourites
    }

    pub fn hidden(&self) -> &HiddenRepo {
        &self.hidden
    }

    pub fn playlists(&self) -> &PlaylistsRepo {
        &self.playlists
    }

    pub fn statistics(&self) -> &StatisticsRepo {
        &self.statistics
    }

    /// Awaitable statistics event surface.
    pub fn stats_engine(&self) -> StatsEngine {
        StatsEngine::new(self.statistics.clone())
    }

    /// Fire-and-forget statistics event surface.
    pub fn stats_events(&self) -> StatsEvents {
        StatsEvents::new(self.stats_engine())
    }

    /// Consistency coordinator bound to this library's catalog.
    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(Arc::clone(&self.catalog), self.prune_stale)
    }

    /// Create a custom playlist and, when it is actually new, fire the
    /// playlist-created statistics event.
    pub async fn create_playlist(&self, title: &str) -> Result<bool> {
        let created = self.playlists.create(title).await?;
        if created {
            // Fire-and-forget; the creation itself already succeeded
            let _ = self.stats_events().record_playlist_created();
        }
        Ok(created)
    }
}
