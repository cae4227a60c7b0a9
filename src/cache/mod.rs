//! In-process folder-resolution cache
//!
//! Maps `(parent folder id, folder name)` to a previously resolved Drive
//! folder id. Entries are hints, never authoritative: the resolver verifies
//! every hit against the backend, so eviction is always safe and carries only
//! a performance cost. Eviction is a periodic full sweep plus explicit
//! operator invalidation; there is no LRU and no persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Composite cache key: parent folder id + child folder name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderKey {
    pub parent_id: String,
    pub name: String,
}

impl FolderKey {
    pub fn new(parent_id: &str, name: &str) -> Self {
        Self {
            parent_id: parent_id.to_string(),
            name: name.to_string(),
        }
    }

    /// Rendered form used for logging and substring invalidation
    fn rendered(&self) -> String {
        format!("{}:{}", self.parent_id, self.name)
    }
}

/// Shared folder-id cache.
///
/// Constructed once at process start and handed to the resolver and the
/// sweeper task as an `Arc`. Safe for concurrent use; no operation touches
/// the network or blocks beyond the internal lock.
#[derive(Default)]
pub struct FolderCache {
    entries: Mutex<HashMap<FolderKey, String>>,
}

impl FolderCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<FolderKey, String>> {
        // A poisoned lock only means a panic elsewhere; the map itself is
        // still usable as a hint store.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Look up a cached folder id
    pub fn get(&self, parent_id: &str, name: &str) -> Option<String> {
        self.entries()
            .get(&FolderKey::new(parent_id, name))
            .cloned()
    }

    /// Record a resolved folder id
    pub fn put(&self, parent_id: &str, name: &str, folder_id: &str) {
        self.entries()
            .insert(FolderKey::new(parent_id, name), folder_id.to_string());
    }

    /// Drop a single entry, returning the removed id if one existed
    pub fn invalidate(&self, parent_id: &str, name: &str) -> Option<String> {
        self.entries().remove(&FolderKey::new(parent_id, name))
    }

    /// Drop every entry whose rendered `parent:name` key contains
    /// `substring`. Returns the number of entries removed.
    pub fn invalidate_matching(&self, substring: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.rendered().contains(substring));
        before - entries.len()
    }

    /// Drop everything, returning the evicted count
    pub fn clear(&self) -> usize {
        let mut entries = self.entries();
        let evicted = entries.len();
        entries.clear();
        evicted
    }

    /// Periodic full eviction; identical to `clear` but logged as
    /// maintenance
    pub fn sweep(&self) -> usize {
        let evicted = self.clear();
        if evicted > 0 {
            log::info!("Swept folder cache ({} entries evicted)", evicted);
        }
        evicted
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn the maintenance task that fully evicts the cache on a fixed
/// interval. The handle is dropped with the process; aborting it is safe at
/// any point since the cache is rebuildable from the backend.
pub fn spawn_sweeper(cache: Arc<FolderCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // interval fires immediately; skip the startup tick
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.sweep();
        }
    })
}
