// src/watch/cache.rs

use std::path::Path;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::types::ScriptPath;
use crate::watch::hash::ContentHash;

/// Hash of the last executed content of every script, keyed by path.
///
/// Lives for the whole process (cleared only on deactivation) so a script
/// that stops matching and later matches again with the same content is not
/// re-run. Only the latest hash is kept, not a history.
#[derive(Debug, Default)]
pub struct ContentCache {
    hashes: DashMap<ScriptPath, ContentHash>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `content` of `path` must be executed.
    ///
    /// Returns `false` without touching the cache if the stored hash matches;
    /// otherwise stores the new hash and returns `true`. The check-and-set
    /// holds the entry lock for `path`, so two concurrent callers with the
    /// same content cannot both get `true`.
    pub fn should_run(&self, path: &Path, content: &str) -> bool {
        let hash = ContentHash::of(content);

        match self.hashes.entry(path.to_path_buf()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == hash {
                    debug!(path = %path.display(), "content unchanged; skipping");
                    false
                } else {
                    entry.insert(hash);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(hash);
                true
            }
        }
    }

    pub fn hash_of(&self, path: &Path) -> Option<ContentHash> {
        self.hashes.get(path).map(|h| *h)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn clear(&self) {
        self.hashes.clear();
    }
}
