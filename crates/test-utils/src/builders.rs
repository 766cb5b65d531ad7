#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use autoscripts::config::ScriptsInspection;
use autoscripts::engine::{EngineEvent, Reconciler};
use autoscripts::fs::mock::MockFileSystem;
use tokio::sync::mpsc;

use crate::{FakeHost, FakeWatchBackend, RecordingEngine};

/// Builder for `ScriptsInspection` to simplify test setup.
#[derive(Debug, Default)]
pub struct InspectionBuilder {
    inspection: ScriptsInspection,
}

fn owned(patterns: &[&str]) -> Option<Vec<String>> {
    Some(patterns.iter().map(|p| p.to_string()).collect())
}

impl InspectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, patterns: &[&str]) -> Self {
        self.inspection.default_value = owned(patterns);
        self
    }

    pub fn global(mut self, patterns: &[&str]) -> Self {
        self.inspection.global_value = owned(patterns);
        self
    }

    pub fn workspace(mut self, patterns: &[&str]) -> Self {
        self.inspection.workspace_value = owned(patterns);
        self
    }

    pub fn workspace_folder(mut self, patterns: &[&str]) -> Self {
        self.inspection.workspace_folder_value = owned(patterns);
        self
    }

    pub fn build(self) -> ScriptsInspection {
        self.inspection
    }
}

/// A [`Reconciler`] wired to in-memory fakes.
pub struct Harness {
    pub base_dir: PathBuf,
    pub fs: MockFileSystem,
    pub host: Arc<FakeHost>,
    pub engine: Arc<RecordingEngine>,
    pub watches: FakeWatchBackend,
    pub reconciler: Arc<Reconciler>,
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
    pub events_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl Harness {
    /// Relative patterns resolve against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let fs = MockFileSystem::new();
        let host = Arc::new(FakeHost::new());
        let engine = Arc::new(RecordingEngine::new());
        let watches = FakeWatchBackend::new();
        let (events_tx, events) = mpsc::unbounded_channel();

        let reconciler = Arc::new(Reconciler::new(
            host.clone(),
            Arc::new(fs.clone()),
            engine.clone(),
            Arc::new(watches.clone()),
            events_tx.clone(),
            base_dir.clone(),
        ));

        Self {
            base_dir,
            fs,
            host,
            engine,
            watches,
            reconciler,
            events,
            events_tx,
        }
    }

    /// Hand the event receiver to a `Runtime`; the harness keeps a closed one.
    pub fn take_events(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
        std::mem::replace(&mut self.events, mpsc::unbounded_channel().1)
    }

    /// Absolute path of `rel` under the base directory.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.base_dir.join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        self.fs.add_file(&path, content.as_bytes());
        path
    }

    pub fn watched(&self) -> Vec<PathBuf> {
        self.reconciler.registry().paths()
    }

    pub fn is_watched(&self, path: impl AsRef<Path>) -> bool {
        self.reconciler.registry().generation_of(path.as_ref()).is_some()
    }
}
