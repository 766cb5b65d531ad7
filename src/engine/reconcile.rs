// src/engine/reconcile.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::effective_patterns;
use crate::engine::EngineEvent;
use crate::errors::{AutoscriptsError, ReadError};
use crate::exec::{Script, ScriptContext, ScriptEngine};
use crate::fs::FileSystem;
use crate::host::Host;
use crate::patterns::{resolve, VariableExpander};
use crate::types::{Generation, ScriptPath, WatchId};
use crate::watch::{ContentCache, WatchBackend, WatchRegistry, WatchStatus};

/// What happened to one script when it was considered for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Content was new; the script ran (successfully).
    Executed,
    /// Content matched the last executed version.
    Skipped,
    /// The change came from a watch that is no longer current.
    Stale,
}

/// Summary of one reconciliation cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub generation: Generation,
    /// Effective patterns for this cycle, before expansion.
    pub patterns: Vec<String>,
    pub executed: Vec<ScriptPath>,
    pub skipped: Vec<ScriptPath>,
    /// Paths whose watches were closed by this cycle's sweep.
    pub swept: Vec<ScriptPath>,
    pub errors: Vec<AutoscriptsError>,
    /// The configuration could not be read; nothing was resolved or swept.
    pub aborted: bool,
}

impl CycleReport {
    fn new(generation: Generation) -> Self {
        Self {
            generation,
            patterns: Vec::new(),
            executed: Vec::new(),
            skipped: Vec::new(),
            swept: Vec::new(),
            errors: Vec::new(),
            aborted: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, unit: Unit) {
        match unit {
            Unit::Executed(path) => self.executed.push(path),
            Unit::Skipped(path) => self.skipped.push(path),
            Unit::Failed(err) => self.errors.push(err),
        }
    }
}

/// Per-path result inside a cycle.
#[derive(Debug)]
enum Unit {
    Executed(ScriptPath),
    Skipped(ScriptPath),
    Failed(AutoscriptsError),
}

/// Owns all engine state: the generation counter, the content cache and the
/// watch registry.
///
/// Shared as `Arc<Reconciler>` between the runtime loop and the cycles it
/// spawns. Cycles may overlap; each is stamped with its own generation.
pub struct Reconciler {
    generation: AtomicU64,
    cache: ContentCache,
    registry: WatchRegistry,
    host: Arc<dyn Host>,
    fs: Arc<dyn FileSystem>,
    engine: Arc<dyn ScriptEngine>,
    expander: VariableExpander,
    base_dir: PathBuf,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("generation", &self.generation)
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// `events` receives the change/failure notifications of every watch the
    /// registry opens. Relative patterns resolve against `base_dir`.
    pub fn new(
        host: Arc<dyn Host>,
        fs: Arc<dyn FileSystem>,
        engine: Arc<dyn ScriptEngine>,
        backend: Arc<dyn WatchBackend>,
        events: mpsc::UnboundedSender<EngineEvent>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            generation: AtomicU64::new(0),
            cache: ContentCache::new(),
            registry: WatchRegistry::new(backend, events),
            expander: VariableExpander::new(Arc::clone(&host)),
            host,
            fs,
            engine,
            base_dir: base_dir.into(),
        }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Generation of the most recently started cycle (0 before the first).
    pub fn generation(&self) -> Generation {
        Generation::new(self.generation.load(Ordering::SeqCst))
    }

    fn next_generation(&self) -> Generation {
        Generation::new(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// One full cycle: read configuration, expand and resolve every pattern
    /// concurrently, watch and maybe run every match, then sweep.
    pub async fn run_cycle(&self) -> CycleReport {
        let generation = self.next_generation();
        let mut report = CycleReport::new(generation);
        info!(%generation, "reconciliation cycle started");

        let host = Arc::clone(&self.host);
        let inspection = match tokio::task::spawn_blocking(move || host.inspect_scripts()).await {
            Ok(Ok(inspection)) => inspection,
            Ok(Err(err)) => {
                error!(%generation, error = %err, "cannot read configuration; keeping existing watches");
                report.errors.push(err.into());
                report.aborted = true;
                return report;
            }
            Err(err) => {
                error!(%generation, error = %err, "configuration task failed");
                report.errors.push(anyhow!("configuration task failed: {err}").into());
                report.aborted = true;
                return report;
            }
        };

        report.patterns = effective_patterns(&inspection);
        debug!(%generation, patterns = ?report.patterns, "effective patterns");

        let units = join_all(
            report
                .patterns
                .iter()
                .map(|pattern| self.reconcile_pattern(pattern, generation)),
        )
        .await;

        for unit in units.into_iter().flatten() {
            report.record(unit);
        }

        report.swept = self.registry.sweep(generation);

        info!(
            %generation,
            executed = report.executed.len(),
            skipped = report.skipped.len(),
            swept = report.swept.len(),
            errors = report.errors.len(),
            "reconciliation cycle finished"
        );
        report
    }

    async fn reconcile_pattern(&self, pattern: &str, generation: Generation) -> Vec<Unit> {
        let expanded = match self.expander.expand(pattern).await {
            Ok(expanded) => expanded,
            Err(err) => {
                warn!(%pattern, error = %err, "pattern expansion failed");
                return vec![Unit::Failed(err.into())];
            }
        };

        let fs = Arc::clone(&self.fs);
        let base_dir = self.base_dir.clone();
        let glob = expanded.clone();
        let resolved =
            tokio::task::spawn_blocking(move || resolve(fs.as_ref(), &base_dir, &glob)).await;

        let paths = match resolved {
            Ok(Ok(paths)) => paths,
            Ok(Err(err)) => {
                warn!(%pattern, error = %err, "pattern resolution failed");
                return vec![Unit::Failed(err.into())];
            }
            Err(err) => {
                warn!(%pattern, error = %err, "resolution task failed");
                return vec![Unit::Failed(anyhow!("resolving `{expanded}`: {err}").into())];
            }
        };

        debug!(%pattern, %expanded, matches = paths.len(), "pattern resolved");

        join_all(
            paths
                .into_iter()
                .map(|path| self.reconcile_path(path, generation)),
        )
        .await
        .into_iter()
        .flatten()
        .collect()
    }

    /// Watch `path` for this generation, then run it if its content is new.
    ///
    /// A failed watch is reported but does not prevent the run.
    async fn reconcile_path(&self, path: ScriptPath, generation: Generation) -> Vec<Unit> {
        let mut units = Vec::with_capacity(2);

        match self.registry.ensure_watching(&path, generation) {
            Ok(WatchStatus::Created(id)) => {
                debug!(path = %path.display(), watch = %id, "new watch");
            }
            Ok(WatchStatus::Refreshed(_)) => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot watch script");
                units.push(Unit::Failed(err.into()));
            }
        }

        units.push(match self.read_and_run(&path).await {
            Ok(RunOutcome::Executed) => Unit::Executed(path),
            Ok(_) => Unit::Skipped(path),
            Err(err) => Unit::Failed(err),
        });
        units
    }

    /// Handle a change notification from watch `watch` on `path`.
    ///
    /// Notifications from a handle that has since been closed or replaced are
    /// ignored.
    pub async fn rerun(&self, path: &Path, watch: WatchId) -> Result<RunOutcome, AutoscriptsError> {
        if !self.registry.is_current(path, watch) {
            debug!(path = %path.display(), %watch, "ignoring change from stale watch");
            return Ok(RunOutcome::Stale);
        }

        let outcome = self.read_and_run(path).await;
        if let Err(err) = &outcome {
            warn!(path = %path.display(), error = %err, "re-run failed");
        }
        outcome
    }

    /// Close and forget the watch that reported `reason`.
    pub fn handle_watch_failure(&self, path: &Path, watch: WatchId, reason: &str) -> bool {
        let dropped = self.registry.drop_failed(path, watch);
        if dropped {
            warn!(path = %path.display(), %watch, %reason, "watch failed; entry dropped");
        } else {
            debug!(path = %path.display(), %watch, %reason, "failure from stale watch ignored");
        }
        dropped
    }

    async fn read_and_run(&self, path: &Path) -> Result<RunOutcome, AutoscriptsError> {
        let fs = Arc::clone(&self.fs);
        let read_path = path.to_path_buf();
        let content = tokio::task::spawn_blocking(move || fs.read_to_string(&read_path))
            .await
            .map_err(|err| ReadError {
                path: path.to_path_buf(),
                source: Box::new(err),
            })?
            .map_err(|err| ReadError {
                path: path.to_path_buf(),
                source: err.into(),
            })?;

        if !self.cache.should_run(path, &content) {
            return Ok(RunOutcome::Skipped);
        }

        let context = ScriptContext::new(
            Arc::clone(&self.host),
            Arc::clone(&self.fs),
            path.to_path_buf(),
        );
        let script = Script::new(path, content);

        if let Err(err) = self.engine.execute(script, context).await {
            warn!(path = %path.display(), error = %err, "script failed");
            return Err(err.into());
        }
        Ok(RunOutcome::Executed)
    }

    /// Forget all content hashes and close every watch.
    pub fn deactivate(&self) {
        let watches = self.registry.len();
        self.cache.clear();
        self.registry.clear();
        info!(closed = watches, "autoscripts deactivated");
    }
}
