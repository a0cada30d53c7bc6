use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::types::LogRow;

// ---------------------------------------------------------------------------
// PostedStore: local cache of delivered fixture ids
// ---------------------------------------------------------------------------

/// Fixture ids already delivered, persisted as a JSON array.
///
/// Reloaded from disk at the start of every cycle so external edits are
/// honored. Only the dispatcher and the reconciler's self-healing path write it,
/// and every write replaces the whole file atomically.
#[derive(Debug)]
pub struct PostedStore {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl PostedStore {
    /// Load the store. A missing file is an empty store; an unreadable one is
    /// treated as empty (with a warning) so the remote log still guards dedup.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids: Vec<String> = read_json_or_default(&path).await?;
        Ok(Self {
            path,
            ids: ids.into_iter().collect(),
        })
    }

    pub fn contains(&self, fixture_id: &str) -> bool {
        self.ids.contains(fixture_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Insert and persist immediately. Returns whether the id was new.
    pub async fn insert_and_persist(&mut self, fixture_id: &str) -> Result<bool> {
        let added = self.ids.insert(fixture_id.to_string());
        if added {
            self.persist().await?;
        }
        Ok(added)
    }

    pub async fn persist(&self) -> Result<()> {
        let ids: Vec<&String> = self.ids.iter().collect();
        write_json_atomic(&self.path, &ids).await
    }
}

// ---------------------------------------------------------------------------
// PendingLogStore: durable-log rows awaiting backfill
// ---------------------------------------------------------------------------

/// Rows that were delivered to the channel but could not be appended to the
/// durable log. Re-appended on a later cycle.
#[derive(Debug)]
pub struct PendingLogStore {
    path: PathBuf,
    rows: Vec<LogRow>,
}

impl PendingLogStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = read_json_or_default(&path).await?;
        Ok(Self { path, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[LogRow] {
        &self.rows
    }

    pub async fn push(&mut self, row: LogRow) -> Result<()> {
        self.rows.push(row);
        self.persist().await
    }

    /// Replace the queue with `rows` (what is still unflushed) and persist.
    pub async fn replace(&mut self, rows: Vec<LogRow>) -> Result<()> {
        self.rows = rows;
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.rows).await
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let body = match tokio::fs::read_to_string(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    match serde_json::from_str(&body) {
        Ok(v) => Ok(v),
        Err(e) => {
            warn!(path = %path.display(), "[STORE] unreadable store, starting empty: {e}");
            Ok(T::default())
        }
    }
}

/// Write to `<path>.tmp` then rename over `path`, so a crash leaves either the
/// old file or the new one, never a truncated one.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let body = serde_json::to_string_pretty(value)?;
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
