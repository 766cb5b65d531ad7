// src/config/watcher.rs

//! Turns edits of any scope's `settings.toml` into
//! [`EngineEvent::ConfigChanged`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::EngineEvent;

/// Quiet period used to coalesce the burst of events a single save produces.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Keeps the settings watcher alive; dropping it stops config notifications.
pub struct ConfigWatcherHandle {
    _inner: Arc<Mutex<RecommendedWatcher>>,
}

impl std::fmt::Debug for ConfigWatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatcherHandle").finish()
    }
}

/// Watch the given settings files and send one `ConfigChanged` per burst of
/// changes.
///
/// Each file's directory is watched rather than the file, so the file may be
/// created, replaced or deleted. If the directory itself does not exist yet
/// (e.g. no `.autoscripts/` in the workspace), its parent is watched until
/// the directory appears.
pub fn spawn_config_watcher(
    settings_files: Vec<PathBuf>,
    runtime_tx: mpsc::UnboundedSender<EngineEvent>,
) -> Result<ConfigWatcherHandle> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        },
        Config::default(),
    )?;
    let watcher = Arc::new(Mutex::new(watcher));

    let files: HashSet<PathBuf> = settings_files.iter().cloned().collect();
    let mut pending_dirs: HashSet<PathBuf> = HashSet::new();

    for file in &settings_files {
        let Some(dir) = file.parent() else { continue };
        if dir.is_dir() {
            watch_dir(&watcher, dir);
        } else if let Some(parent) = dir.parent().filter(|p| p.is_dir()) {
            watch_dir(&watcher, parent);
            pending_dirs.insert(dir.to_path_buf());
        } else {
            debug!(file = %file.display(), "no existing directory to watch for settings file");
        }
    }

    info!(files = ?settings_files, "watching settings files");

    let task_watcher = Arc::clone(&watcher);
    tokio::spawn(async move {
        while let Some(res) = event_rx.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "settings watch error");
                    continue;
                }
            };

            if !is_relevant(&event, &files, &mut pending_dirs, &task_watcher) {
                continue;
            }

            // Let the writer finish, then swallow the rest of the burst.
            tokio::time::sleep(DEBOUNCE).await;
            while event_rx.try_recv().is_ok() {}

            debug!("settings changed");
            if runtime_tx.send(EngineEvent::ConfigChanged).is_err() {
                break;
            }
        }
        debug!("settings watcher loop finished");
    });

    Ok(ConfigWatcherHandle { _inner: watcher })
}

fn watch_dir(watcher: &Arc<Mutex<RecommendedWatcher>>, dir: &Path) {
    let mut guard = watcher.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Err(err) = guard.watch(dir, RecursiveMode::NonRecursive) {
        warn!(dir = %dir.display(), error = %err, "cannot watch settings directory");
    }
}

fn is_relevant(
    event: &Event,
    files: &HashSet<PathBuf>,
    pending_dirs: &mut HashSet<PathBuf>,
    watcher: &Arc<Mutex<RecommendedWatcher>>,
) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }

    let mut relevant = false;
    for path in &event.paths {
        if files.contains(path) {
            relevant = true;
        } else if pending_dirs.contains(path) && path.is_dir() {
            // The settings directory was just created; start watching it and
            // treat it as a change since the file may already be inside.
            watch_dir(watcher, path);
            pending_dirs.remove(path);
            relevant = true;
        }
    }
    relevant
}
