//! Set-membership repository for favourite/hidden marks.
//!
//! One [`MarkRepo`] instance serves one table; favourites and hidden are the
//! two instantiations. Marking is idempotent (`ON CONFLICT DO NOTHING`) and
//! unmarking an absent target is a successful no-op, so duplicate UI toggles
//! are absorbed without errors.

use crate::error::Result;
use crate::model::MarkTarget;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Repository over one mark table.
///
/// Mutations serialize on the write gate; clones share the same gate, so the
/// single-writer contract holds across every handle to the same view.
#[derive(Clone)]
pub struct MarkRepo {
    pool: SqlitePool,
    table: &'static str,
    write_gate: Arc<Mutex<()>>,
}

impl MarkRepo {
    pub(crate) fn new(pool: SqlitePool, table: &'static str) -> Self {
        Self {
            pool,
            table,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Add a mark. Already-marked targets are a no-op success.
    pub async fn mark(&self, target: &MarkTarget) -> Result<()> {
        let _guard = self.write_gate.lock().await;
        sqlx::query(&format!(
            "INSERT INTO {} (target_kind, name, playlist_kind) VALUES (?, ?, ?) \
             ON CONFLICT DO NOTHING",
            self.table
        ))
        .bind(target.kind_str())
        .bind(target.name())
        .bind(target.playlist_kind_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a mark. Returns whether a row was actually deleted; removing
    /// a never-marked target succeeds with `false`.
    pub async fn unmark(&self, target: &MarkTarget) -> Result<bool> {
        let _guard = self.write_gate.lock().await;
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE target_kind = ? AND name = ?",
            self.table
        ))
        .bind(target.kind_str())
        .bind(target.name())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All marks in the table, unresolved against the catalog.
    ///
    /// Callers wanting only live entries go through the consistency
    /// coordinator instead.
    pub async fn all(&self) -> Result<Vec<MarkTarget>> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(&format!(
            "SELECT target_kind, name, playlist_kind FROM {} ORDER BY name",
            self.table
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(kind, name, playlist_kind)| {
                MarkTarget::from_columns(&kind, name, playlist_kind.as_deref())
            })
            .collect()
    }

    /// Whether a target is currently marked.
    pub async fn contains(&self, target: &MarkTarget) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT 1 FROM {} WHERE target_kind = ? AND name = ?",
            self.table
        ))
        .bind(target.kind_str())
        .bind(target.name())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Remove several marks in one atomic mutation (lazy pruning path).
    /// Returns the number of rows deleted.
    pub async fn remove_many(&self, targets: &[MarkTarget]) -> Result<u64> {
        if targets.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for target in targets {
            let result = sqlx::query(&format!(
                "DELETE FROM {} WHERE target_kind = ? AND name = ?",
                self.table
            ))
            .bind(target.kind_str())
            .bind(target.name())
            .execute(&mut *tx)
            .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;
        Ok(removed)
    }
}
