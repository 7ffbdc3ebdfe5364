//! Durable store for rolling play-count records.
//!
//! The rollover arithmetic lives in [`crate::stats`]; this repository
//! provides the atomic load-apply-persist mutation it runs inside. The
//! whole read-modify-write happens under the write gate and in one
//! transaction, so concurrent events for the same key serialize and a
//! failure rolls back without a partial update.
//!
//! Records are keyed by `(kind, key)`: an artist who happens to share a name
//! with a track path never collides with it.

use crate::error::{Error, Result};
use crate::model::{StatKind, StatWindow, StatisticsRecord};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Raw row shape; SQLite hands every integer back as i64.
#[derive(Debug, FromRow)]
struct StatRow {
    key: String,
    kind: String,
    all_time: i64,
    yearly: i64,
    monthly: i64,
    weekly: i64,
    daily: i64,
    bucket_year: i64,
    bucket_month: i64,
    bucket_week_year: i64,
    bucket_week: i64,
    bucket_day: i64,
}

impl StatRow {
    fn into_record(self) -> Result<StatisticsRecord> {
        Ok(StatisticsRecord {
            kind: StatKind::parse(&self.kind)?,
            key: self.key,
            all_time: self.all_time,
            yearly: self.yearly,
            monthly: self.monthly,
            weekly: self.weekly,
            daily: self.daily,
            bucket_year: decode_bucket(self.bucket_year, "bucket_year")?,
            bucket_month: decode_bucket(self.bucket_month, "bucket_month")?,
            bucket_week_year: decode_bucket(self.bucket_week_year, "bucket_week_year")?,
            bucket_week: decode_bucket(self.bucket_week, "bucket_week")?,
            bucket_day: decode_bucket(self.bucket_day, "bucket_day")?,
        })
    }
}

/// A bucket column outside its calendar type's range means the row was not
/// written by this crate; fail loudly rather than truncate.
fn decode_bucket<T: TryFrom<i64>>(value: i64, column: &str) -> Result<T> {
    value
        .try_into()
        .map_err(|_| Error::invariant(format!("statistics {column} out of range: {value}")))
}

const SELECT_COLUMNS: &str = "key, kind, all_time, yearly, monthly, weekly, daily, \
     bucket_year, bucket_month, bucket_week_year, bucket_week, bucket_day";

/// Repository over the `statistics` table.
#[derive(Clone)]
pub struct StatisticsRepo {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl StatisticsRepo {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Load the record for a key, if one exists.
    pub async fn get(&self, kind: StatKind, key: &str) -> Result<Option<StatisticsRecord>> {
        let row = sqlx::query_as::<_, StatRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM statistics WHERE kind = ? AND key = ?"
        ))
        .bind(kind.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(StatRow::into_record).transpose()
    }

    /// Records of one kind ranked by a window's counter, highest first.
    pub async fn top(
        &self,
        kind: StatKind,
        window: StatWindow,
        limit: i64,
    ) -> Result<Vec<StatisticsRecord>> {
        let rows = sqlx::query_as::<_, StatRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM statistics WHERE kind = ? \
             ORDER BY {} DESC, key LIMIT ?",
            window.column()
        ))
        .bind(kind.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(StatRow::into_record).collect()
    }

    /// Atomically load the record for `(kind, key)`, apply `op`, and persist
    /// the result. This is the single mutation path for statistics: `op`
    /// sees the committed state and no other mutation interleaves with it.
    pub async fn mutate<F>(&self, kind: StatKind, key: &str, op: F) -> Result<StatisticsRecord>
    where
        F: FnOnce(Option<StatisticsRecord>) -> StatisticsRecord,
    {
        let _guard = self.write_gate.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, StatRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM statistics WHERE kind = ? AND key = ?"
        ))
        .bind(kind.as_str())
        .bind(key)
        .fetch_optional(&mut *tx)
        .await?
        .map(StatRow::into_record)
        .transpose()?;

        let updated = op(existing);

        sqlx::query(
            "INSERT INTO statistics \
             (key, kind, all_time, yearly, monthly, weekly, daily, \
              bucket_year, bucket_month, bucket_week_year, bucket_week, bucket_day) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(kind, key) DO UPDATE SET \
                 all_time = excluded.all_time, \
                 yearly = excluded.yearly, \
                 monthly = excluded.monthly, \
                 weekly = excluded.weekly, \
                 daily = excluded.daily, \
                 bucket_year = excluded.bucket_year, \
                 bucket_month = excluded.bucket_month, \
                 bucket_week_year = excluded.bucket_week_year, \
                 bucket_week = excluded.bucket_week, \
                 bucket_day = excluded.bucket_day",
        )
        .bind(&updated.key)
        .bind(updated.kind.as_str())
        .bind(updated.all_time)
        .bind(updated.yearly)
        .bind(updated.monthly)
        .bind(updated.weekly)
        .bind(updated.daily)
        .bind(updated.bucket_year as i64)
        .bind(updated.bucket_month as i64)
        .bind(updated.bucket_week_year as i64)
        .bind(updated.bucket_week as i64)
        .bind(updated.bucket_day as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_db;

    fn blank(key: &str, kind: StatKind) -> StatisticsRecord {
        StatisticsRecord {
            key: key.to_string(),
            kind,
            all_time: 0,
            yearly: 0,
            monthly: 0,
            weekly: 0,
            daily: 0,
            bucket_year: 2026,
            bucket_month: 8,
            bucket_week_year: 2026,
            bucket_week: 35,
            bucket_day: 241,
        }
    }

    #[tokio::test]
    async fn test_mutate_inserts_and_roundtrips() {
        let (pool, _dir) = temp_db().await;
        let repo = StatisticsRepo::new(pool);

        let record = repo
            .mutate(StatKind::Track, "/m/a.mp3", |existing| {
                assert!(existing.is_none());
                let mut r = blank("/m/a.mp3", StatKind::Track);
                r.all_time = 1;
                r.daily = 1;
                r
            })
            .await
            .unwrap();
        assert_eq!(record.all_time, 1);

        let loaded = repo.get(StatKind::Track, "/m/a.mp3").await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_mutate_sees_committed_state() {
        let (pool, _dir) = temp_db().await;
        let repo = StatisticsRepo::new(pool);

        for _ in 0..3 {
            repo.mutate(StatKind::Artist, "Ana", |existing| {
                let mut r = existing.unwrap_or_else(|| blank("Ana", StatKind::Artist));
                r.all_time += 1;
                r
            })
            .await
            .unwrap();
        }

        let record = repo.get(StatKind::Artist, "Ana").await.unwrap().unwrap();
        assert_eq!(record.all_time, 3);
    }

    #[tokio::test]
    async fn test_same_key_different_kind_do_not_collide() {
        let (pool, _dir) = temp_db().await;
        let repo = StatisticsRepo::new(pool);

        repo.mutate(StatKind::Track, "Mirror", |_| {
            let mut r = blank("Mirror", StatKind::Track);
            r.all_time = 1;
            r
        })
        .await
        .unwrap();
        repo.mutate(StatKind::Artist, "Mirror", |_| {
            let mut r = blank("Mirror", StatKind::Artist);
            r.all_time = 7;
            r
        })
        .await
        .unwrap();

        assert_eq!(
            repo.get(StatKind::Track, "Mirror").await.unwrap().unwrap().all_time,
            1
        );
        assert_eq!(
            repo.get(StatKind::Artist, "Mirror").await.unwrap().unwrap().all_time,
            7
        );
    }

    #[tokio::test]
    async fn test_concurrent_mutations_never_interleave() {
        let (pool, _dir) = temp_db().await;
        let repo = StatisticsRepo::new(pool);

        // N concurrent read-modify-write increments end at exactly N
        let mut handles = Vec::new();
        for _ in 0..20 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.mutate(StatKind::Track, "/m/hot.mp3", |existing| {
                    let mut r =
                        existing.unwrap_or_else(|| blank("/m/hot.mp3", StatKind::Track));
                    r.all_time += 1;
                    r
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = repo.get(StatKind::Track, "/m/hot.mp3").await.unwrap().unwrap();
        assert_eq!(record.all_time, 20);
    }

    #[tokio::test]
    async fn test_out_of_range_bucket_fails_loudly() {
        let (pool, _dir) = temp_db().await;
        let repo = StatisticsRepo::new(pool.clone());

        // A row this crate would never write: negative month bucket
        sqlx::query(
            "INSERT INTO statistics \
             (key, kind, all_time, yearly, monthly, weekly, daily, \
              bucket_year, bucket_month, bucket_week_year, bucket_week, bucket_day) \
             VALUES ('/m/bad.mp3', 'track', 1, 1, 1, 1, 1, 2026, -3, 2026, 35, 241)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = repo.get(StatKind::Track, "/m/bad.mp3").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_top_ranks_by_window() {
        let (pool, _dir) = temp_db().await;
        let repo = StatisticsRepo::new(pool);

        for (key, daily) in [("/m/a.mp3", 2), ("/m/b.mp3", 9), ("/m/c.mp3", 5)] {
            repo.mutate(StatKind::Track, key, |_| {
                let mut r = blank(key, StatKind::Track);
                r.daily = daily;
                r.all_time = daily;
                r
            })
            .await
            .unwrap();
        }
        // A different kind must not appear in track rankings
        repo.mutate(StatKind::Artist, "Ana", |_| {
            let mut r = blank("Ana", StatKind::Artist);
            r.daily = 100;
            r
        })
        .await
        .unwrap();

        let top = repo
            .top(StatKind::Track, StatWindow::Daily, 2)
            .await
            .unwrap();
        let keys: Vec<_> = top.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["/m/b.mp3", "/m/c.mp3"]);
    }
}
