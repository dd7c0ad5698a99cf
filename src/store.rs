//! Abstract snapshot storage.
//!
//! The engine never persists anything itself; it reads history through
//! this trait and hands updated snapshots back to the caller. A missing
//! snapshot is `Ok(None)`, never an error; "no data for that date" is a
//! normal answer during trend lookups.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::NaiveDate;
use thiserror::Error;

use crate::snapshot::{ScopeKey, Snapshot};

/// Errors from a snapshot-store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure (I/O, connection, poisoned lock).
    #[error("snapshot store backend error: {0}")]
    Backend(String),

    /// A stored snapshot could not be decoded.
    #[error("snapshot decode error: {0}")]
    Decode(String),
}

fn lock_err(context: &'static str) -> StoreError {
    StoreError::Backend(format!("poisoned lock: {context}"))
}

/// Storage contract for dated snapshots.
///
/// Implementations index snapshots by [`ScopeKey`] and date. The file
/// layout (or database schema) behind this trait is the caller's concern.
pub trait SnapshotStore: Send + Sync {
    /// Loads the snapshot for a scope and date, `Ok(None)` if absent.
    fn load(&self, key: &ScopeKey, date: NaiveDate) -> Result<Option<Snapshot>, StoreError>;

    /// Saves (or replaces) a snapshot under its own scope key and date.
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Dates with a stored snapshot strictly before `date`, newest first,
    /// at most `limit` of them.
    fn dates_before(
        &self,
        key: &ScopeKey,
        date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, StoreError>;
}

/// Thread-safe in-memory snapshot store.
///
/// Reference implementation for tests and embedded callers.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: RwLock<HashMap<ScopeKey, BTreeMap<NaiveDate, Snapshot>>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &ScopeKey, date: NaiveDate) -> Result<Option<Snapshot>, StoreError> {
        let guard = self.inner.read().map_err(|_| lock_err("load"))?;
        Ok(guard.get(key).and_then(|series| series.get(&date)).cloned())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let mut guard = self.inner.write().map_err(|_| lock_err("save"))?;
        guard
            .entry(snapshot.scope_key())
            .or_default()
            .insert(snapshot.date, snapshot.clone());
        Ok(())
    }

    fn dates_before(
        &self,
        key: &ScopeKey,
        date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let guard = self.inner.read().map_err(|_| lock_err("dates_before"))?;
        let Some(series) = guard.get(key) else {
            return Ok(Vec::new());
        };
        Ok(series
            .range(..date)
            .rev()
            .take(limit)
            .map(|(d, _)| *d)
            .collect())
    }
}
