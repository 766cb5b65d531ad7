// src/watch/watcher.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::engine::EngineEvent;
use crate::errors::WatchError;
use crate::types::{ScriptPath, WatchId};

/// An open OS-level watch on one script file.
///
/// Owned exclusively by the [`WatchRegistry`](crate::watch::WatchRegistry);
/// closing it stops all further notifications.
pub trait WatchHandle: Send + fmt::Debug {
    fn close(&mut self);
}

/// Creates per-file watches.
///
/// Production code uses [`NotifyBackend`]; tests provide a fake that lets
/// them fire change/error notifications by hand.
pub trait WatchBackend: Send + Sync + fmt::Debug {
    fn watch(
        &self,
        path: &Path,
        notifier: WatchNotifier,
    ) -> Result<Box<dyn WatchHandle>, WatchError>;
}

/// Sending side handed to each watch so it can report back to the runtime.
#[derive(Debug, Clone)]
pub struct WatchNotifier {
    path: ScriptPath,
    id: WatchId,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl WatchNotifier {
    pub fn new(path: ScriptPath, id: WatchId, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { path, id, tx }
    }

    pub fn id(&self) -> WatchId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Report that the watched file changed. Returns `false` once the
    /// runtime has gone away.
    pub fn changed(&self) -> bool {
        self.tx
            .send(EngineEvent::ScriptChanged {
                path: self.path.clone(),
                watch: self.id,
            })
            .is_ok()
    }

    /// Report that the OS watch itself failed.
    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.tx
            .send(EngineEvent::WatchFailed {
                path: self.path.clone(),
                watch: self.id,
                reason: reason.into(),
            })
            .is_ok()
    }
}

/// [`WatchBackend`] built on `notify`.
///
/// A single `RecommendedWatcher` serves every script; each watched path is a
/// non-recursive watch on it, and events are routed to the path's notifier.
#[derive(Clone)]
pub struct NotifyBackend {
    shared: Arc<Shared>,
}

struct Shared {
    watcher: Mutex<RecommendedWatcher>,
    routes: Arc<DashMap<PathBuf, WatchNotifier>>,
}

impl fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyBackend")
            .field("watched", &self.shared.routes.len())
            .finish()
    }
}

impl NotifyBackend {
    pub fn new() -> Result<Self, WatchError> {
        let routes: Arc<DashMap<PathBuf, WatchNotifier>> = Arc::new(DashMap::new());

        let callback_routes = Arc::clone(&routes);
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| dispatch(&callback_routes, res),
            Config::default(),
        )
        .map_err(|e| WatchError::BackendFailed {
            reason: e.to_string(),
        })?;

        Ok(Self {
            shared: Arc::new(Shared {
                watcher: Mutex::new(watcher),
                routes,
            }),
        })
    }

    /// Number of paths currently routed.
    pub fn watched_count(&self) -> usize {
        self.shared.routes.len()
    }
}

impl Shared {
    fn watcher(&self) -> MutexGuard<'_, RecommendedWatcher> {
        self.watcher.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Runs on notify's thread.
fn dispatch(routes: &DashMap<PathBuf, WatchNotifier>, res: notify::Result<Event>) {
    match res {
        Ok(event) if is_content_event(&event.kind) => {
            trace!(?event, "script watch event");
            for path in &event.paths {
                if let Some(notifier) = routes.get(path) {
                    notifier.changed();
                }
            }
        }
        Ok(_) => {}
        Err(err) => {
            let mut routed = false;
            for path in &err.paths {
                if let Some(notifier) = routes.get(path) {
                    notifier.failed(err.to_string());
                    routed = true;
                }
            }
            if !routed {
                warn!(error = %err, "script watcher error");
            }
        }
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(
        &self,
        path: &Path,
        notifier: WatchNotifier,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        let id = notifier.id();

        // Route first so no event between the two steps is lost.
        self.shared.routes.insert(path.to_path_buf(), notifier);
        if let Err(err) = self
            .shared
            .watcher()
            .watch(path, RecursiveMode::NonRecursive)
        {
            self.shared.routes.remove_if(path, |_, n| n.id() == id);
            return Err(WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: err.to_string(),
            });
        }

        debug!(path = %path.display(), watch = %id, "script watch opened");
        Ok(Box::new(NotifyWatch {
            shared: Arc::clone(&self.shared),
            path: path.to_path_buf(),
            id,
            open: true,
        }))
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

/// Handle for one path on the shared watcher.
///
/// Closing removes the route, then the OS watch, unless a newer watch for
/// the same path has taken the route over.
struct NotifyWatch {
    shared: Arc<Shared>,
    path: PathBuf,
    id: WatchId,
    open: bool,
}

impl fmt::Debug for NotifyWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyWatch")
            .field("path", &self.path)
            .field("id", &self.id)
            .field("open", &self.open)
            .finish()
    }
}

impl WatchHandle for NotifyWatch {
    fn close(&mut self) {
        if !std::mem::replace(&mut self.open, false) {
            return;
        }
        let id = self.id;
        if self.shared.routes.remove_if(&self.path, |_, n| n.id() == id).is_none() {
            return;
        }
        // The file may already be gone, taking the OS watch with it.
        if let Err(err) = self.shared.watcher().unwatch(&self.path) {
            debug!(path = %self.path.display(), error = %err, "unwatch failed");
        }
        debug!(path = %self.path.display(), watch = %id, "script watch closed");
    }
}

impl Drop for NotifyWatch {
    fn drop(&mut self) {
        self.close();
    }
}
