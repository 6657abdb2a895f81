//! The shared repository registry.
//!
//! `RepoRegistry` is the one piece of mutable shared state in the pipeline:
//! an in-memory map from repository name to its [`RepoRecord`]. It is passed
//! explicitly to every component (never ambient), so independent pipeline
//! instances do not interfere. Loaders create and update individual records;
//! the aggregator takes the lock for its full scan, which guarantees a pass
//! never observes a half-created record.

use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::models::RepoRecord;

/// Reserved record name holding the composed site index page.
pub const REPOSITORY_INDEX: &str = "repository-index";

#[derive(Debug)]
pub struct RepoRegistry {
    inner: Mutex<BTreeMap<String, RepoRecord>>,
}

impl Default for RepoRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoRegistry {
    /// Create a registry seeded with the reserved index record.
    pub fn new() -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            REPOSITORY_INDEX.to_string(),
            RepoRecord::new(REPOSITORY_INDEX),
        );
        RepoRegistry {
            inner: Mutex::new(map),
        }
    }

    /// Create the record for `name` if it does not exist yet.
    pub async fn ensure(&self, name: &str) {
        let mut map = self.inner.lock().await;
        map.entry(name.to_string())
            .or_insert_with(|| RepoRecord::new(name));
    }

    /// Run a closure against the record for `name`, creating it if absent.
    pub async fn update<R>(&self, name: &str, f: impl FnOnce(&mut RepoRecord) -> R) -> R {
        let mut map = self.inner.lock().await;
        let record = map
            .entry(name.to_string())
            .or_insert_with(|| RepoRecord::new(name));
        f(record)
    }

    /// Mutable scan over the full registry. Aggregation and composition use
    /// this so their full pass holds the lock for its duration.
    pub async fn scan_mut<R>(&self, f: impl FnOnce(&mut BTreeMap<String, RepoRecord>) -> R) -> R {
        let mut map = self.inner.lock().await;
        f(&mut map)
    }

    /// Names of all real repositories (the reserved index record excluded),
    /// in deterministic name order.
    pub async fn names(&self) -> Vec<String> {
        let map = self.inner.lock().await;
        map.keys()
            .filter(|name| name.as_str() != REPOSITORY_INDEX)
            .cloned()
            .collect()
    }

    /// Clone of one record, if present.
    pub async fn get(&self, name: &str) -> Option<RepoRecord> {
        let map = self.inner.lock().await;
        map.get(name).cloned()
    }

    /// Last-composed HTML for a record. `None` for unknown or
    /// not-yet-composed repositories, never an error.
    pub async fn composed(&self, name: &str) -> Option<String> {
        let map = self.inner.lock().await;
        map.get(name).and_then(|record| record.composed.clone())
    }
}
