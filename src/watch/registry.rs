// src/watch/registry.rs

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::EngineEvent;
use crate::errors::WatchError;
use crate::types::{Generation, ScriptPath, WatchId};
use crate::watch::watcher::{WatchBackend, WatchHandle, WatchNotifier};

/// One live watch: the last generation that resolved its path plus the
/// handle that owns the OS resource.
#[derive(Debug)]
struct WatchEntry {
    generation: Generation,
    id: WatchId,
    handle: Mutex<Box<dyn WatchHandle>>,
}

impl WatchEntry {
    fn close(self) {
        let mut handle = self
            .handle
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handle.close();
    }
}

/// What [`WatchRegistry::ensure_watching`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    /// A new OS watch was opened.
    Created(WatchId),
    /// The existing watch was kept and re-stamped.
    Refreshed(WatchId),
}

impl WatchStatus {
    pub fn id(self) -> WatchId {
        match self {
            WatchStatus::Created(id) | WatchStatus::Refreshed(id) => id,
        }
    }
}

/// Path → (generation, watch handle) map.
///
/// This is the only owner of watch handles: they are closed exactly when
/// their entry leaves the map (sweep, watch failure, or [`clear`]).
/// Every operation locks a single key, never the whole map.
///
/// [`clear`]: WatchRegistry::clear
#[derive(Debug)]
pub struct WatchRegistry {
    entries: DashMap<ScriptPath, WatchEntry>,
    backend: Arc<dyn WatchBackend>,
    events: mpsc::UnboundedSender<EngineEvent>,
    next_id: AtomicU64,
}

impl WatchRegistry {
    pub fn new(backend: Arc<dyn WatchBackend>, events: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self {
            entries: DashMap::new(),
            backend,
            events,
            next_id: AtomicU64::new(0),
        }
    }

    /// Make sure `path` is watched and stamp it with `generation`.
    ///
    /// An existing watch is never recreated. Stamping is monotonic: a cycle
    /// that is older than the one that last touched the entry does not lower
    /// its generation, so a superseded cycle's late refresh cannot expose the
    /// entry to the newer cycle's sweep.
    pub fn ensure_watching(
        &self,
        path: &Path,
        generation: Generation,
    ) -> Result<WatchStatus, WatchError> {
        match self.entries.entry(path.to_path_buf()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if generation > entry.generation {
                    entry.generation = generation;
                }
                Ok(WatchStatus::Refreshed(entry.id))
            }
            Entry::Vacant(vacant) => {
                let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
                let notifier = WatchNotifier::new(path.to_path_buf(), id, self.events.clone());
                let handle = self.backend.watch(path, notifier)?;

                debug!(path = %path.display(), watch = %id, %generation, "watching script");
                vacant.insert(WatchEntry {
                    generation,
                    id,
                    handle: Mutex::new(handle),
                });
                Ok(WatchStatus::Created(id))
            }
        }
    }

    /// Close and remove every watch last stamped before `current`.
    ///
    /// Must only run once every pattern of cycle `current` has been resolved.
    /// Returns the paths whose watches were closed.
    pub fn sweep(&self, current: Generation) -> Vec<ScriptPath> {
        let stale: Vec<ScriptPath> = self
            .entries
            .iter()
            .filter(|entry| entry.generation < current)
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = Vec::with_capacity(stale.len());
        for path in stale {
            // Re-check under the entry lock: a newer cycle may have
            // refreshed it since the scan.
            if let Some((path, entry)) = self
                .entries
                .remove_if(&path, |_, entry| entry.generation < current)
            {
                debug!(path = %path.display(), watch = %entry.id, generation = %entry.generation, %current, "closing stale watch");
                entry.close();
                removed.push(path);
            }
        }

        if !removed.is_empty() {
            info!(%current, closed = removed.len(), "swept stale watches");
        }
        removed
    }

    /// Close and drop the entry for `path` after its watch reported an error.
    ///
    /// Only the handle identified by `id` is affected; returns `false` if the
    /// entry was already gone or belongs to a newer handle.
    pub fn drop_failed(&self, path: &Path, id: WatchId) -> bool {
        match self.entries.remove_if(path, |_, entry| entry.id == id) {
            Some((_, entry)) => {
                entry.close();
                true
            }
            None => false,
        }
    }

    /// Whether `id` is the live watch for `path`.
    pub fn is_current(&self, path: &Path, id: WatchId) -> bool {
        self.entries
            .get(path)
            .is_some_and(|entry| entry.id == id)
    }

    pub fn generation_of(&self, path: &Path) -> Option<Generation> {
        self.entries.get(path).map(|entry| entry.generation)
    }

    /// Sorted list of watched paths.
    pub fn paths(&self) -> Vec<ScriptPath> {
        let mut paths: Vec<ScriptPath> = self.entries.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Close every watch regardless of generation.
    pub fn clear(&self) {
        let paths: Vec<ScriptPath> = self.entries.iter().map(|e| e.key().clone()).collect();
        for path in paths {
            if let Some((_, entry)) = self.entries.remove(&path) {
                entry.close();
            }
        }
    }
}
