use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::db::models::PickLogRecord;
use crate::error::Result;
use crate::types::LogRow;

/// Append-only record of delivered picks. No transactions, no server-side
/// dedup: callers decide what is a duplicate.
#[async_trait]
pub trait DurableLog: Send + Sync {
    async fn query_all(&self) -> Result<Vec<LogRow>>;
    async fn append(&self, row: &LogRow) -> Result<()>;
}

pub struct SqlitePickLog {
    pool: sqlx::SqlitePool,
}

impl SqlitePickLog {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recent rows first, for the read API.
    pub async fn recent(&self, limit: i64) -> Result<Vec<PickLogRecord>> {
        let rows = sqlx::query_as::<_, PickLogRecord>(
            r#"
            SELECT id, date, match_label, prediction, confidence, result, fixture_id, logged_at
            FROM pick_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl DurableLog for SqlitePickLog {
    async fn query_all(&self) -> Result<Vec<LogRow>> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT date, match_label, prediction, confidence, result, fixture_id
            FROM pick_log
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn append(&self, row: &LogRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pick_log (date, match_label, prediction, confidence, result, fixture_id, logged_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.date)
        .bind(&row.match_label)
        .bind(&row.prediction)
        .bind(row.confidence)
        .bind(&row.result)
        .bind(&row.fixture_id)
        .bind(now_ns() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
