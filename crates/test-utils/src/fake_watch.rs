use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use autoscripts::errors::WatchError;
use autoscripts::types::WatchId;
use autoscripts::watch::{WatchBackend, WatchHandle, WatchNotifier};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

#[derive(Debug)]
struct Slot {
    notifier: WatchNotifier,
    open: bool,
    closes: usize,
}

#[derive(Debug, Default)]
struct State {
    slots: Vec<Slot>,
    failing: Vec<PathBuf>,
}

/// In-memory [`WatchBackend`] that tracks every handle it hands out and lets
/// tests fire change and error notifications by hand.
#[derive(Debug, Default, Clone)]
pub struct FakeWatchBackend {
    state: Arc<Mutex<State>>,
}

impl FakeWatchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to create watches for `path`.
    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        lock(&self.state).failing.push(path.into());
    }

    /// Paths with an open handle, sorted.
    pub fn open_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = lock(&self.state)
            .slots
            .iter()
            .filter(|s| s.open)
            .map(|s| s.notifier.path().to_path_buf())
            .collect();
        paths.sort();
        paths
    }

    pub fn is_open(&self, path: impl AsRef<Path>) -> bool {
        lock(&self.state)
            .slots
            .iter()
            .any(|s| s.open && s.notifier.path() == path.as_ref())
    }

    /// Total number of handles ever created.
    pub fn created(&self) -> usize {
        lock(&self.state).slots.len()
    }

    /// Handles created for `path`, open or not.
    pub fn created_for(&self, path: impl AsRef<Path>) -> usize {
        lock(&self.state)
            .slots
            .iter()
            .filter(|s| s.notifier.path() == path.as_ref())
            .count()
    }

    /// True if some handle was closed more than once.
    pub fn any_double_close(&self) -> bool {
        lock(&self.state).slots.iter().any(|s| s.closes > 1)
    }

    /// Id of the most recent handle for `path`.
    pub fn latest_id(&self, path: impl AsRef<Path>) -> Option<WatchId> {
        lock(&self.state)
            .slots
            .iter()
            .rev()
            .find(|s| s.notifier.path() == path.as_ref())
            .map(|s| s.notifier.id())
    }

    /// Fire a change from the open handle for `path`.
    pub fn fire_change(&self, path: impl AsRef<Path>) -> bool {
        let notifier = self.open_notifier(path.as_ref());
        notifier.is_some_and(|n| n.changed())
    }

    /// Fire a change from handle `id` whether or not it is still open.
    pub fn fire_change_from(&self, id: WatchId) -> bool {
        let notifier = lock(&self.state)
            .slots
            .iter()
            .find(|s| s.notifier.id() == id)
            .map(|s| s.notifier.clone());
        notifier.is_some_and(|n| n.changed())
    }

    /// Fire an OS error from the open handle for `path`.
    pub fn fire_error(&self, path: impl AsRef<Path>, reason: &str) -> bool {
        let notifier = self.open_notifier(path.as_ref());
        notifier.is_some_and(|n| n.failed(reason))
    }

    fn open_notifier(&self, path: &Path) -> Option<WatchNotifier> {
        lock(&self.state)
            .slots
            .iter()
            .rev()
            .find(|s| s.open && s.notifier.path() == path)
            .map(|s| s.notifier.clone())
    }
}

impl WatchBackend for FakeWatchBackend {
    fn watch(
        &self,
        path: &Path,
        notifier: WatchNotifier,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        let mut state = lock(&self.state);
        if state.failing.iter().any(|p| p == path) {
            return Err(WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: "watch refused by test".to_string(),
            });
        }

        let id = notifier.id();
        state.slots.push(Slot {
            notifier,
            open: true,
            closes: 0,
        });

        Ok(Box::new(FakeWatch {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct FakeWatch {
    id: WatchId,
    state: Arc<Mutex<State>>,
}

impl WatchHandle for FakeWatch {
    fn close(&mut self) {
        let mut state = lock(&self.state);
        if let Some(slot) = state.slots.iter_mut().find(|s| s.notifier.id() == self.id) {
            slot.open = false;
            slot.closes += 1;
        }
    }
}
