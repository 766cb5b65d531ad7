use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use autoscripts::errors::ExecutionError;
use autoscripts::exec::{Script, ScriptContext, ScriptEngine};
use futures::future::BoxFuture;
use futures::FutureExt;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// A fake engine that:
/// - records every (path, source) it is asked to run, in order
/// - fails for the paths registered with [`fail_on`](Self::fail_on).
#[derive(Debug, Default)]
pub struct RecordingEngine {
    runs: Mutex<Vec<(PathBuf, String)>>,
    failing: Mutex<HashSet<PathBuf>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, path: impl Into<PathBuf>) {
        lock(&self.failing).insert(path.into());
    }

    pub fn runs(&self) -> Vec<(PathBuf, String)> {
        lock(&self.runs).clone()
    }

    /// Number of times `path` was run.
    pub fn run_count(&self, path: impl AsRef<Path>) -> usize {
        lock(&self.runs)
            .iter()
            .filter(|(p, _)| p == path.as_ref())
            .count()
    }

    /// Sources `path` was run with, oldest first.
    pub fn sources_of(&self, path: impl AsRef<Path>) -> Vec<String> {
        lock(&self.runs)
            .iter()
            .filter(|(p, _)| p == path.as_ref())
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.runs).clear();
    }
}

impl ScriptEngine for RecordingEngine {
    fn execute(
        &self,
        script: Script,
        _context: ScriptContext,
    ) -> BoxFuture<'_, Result<(), ExecutionError>> {
        async move {
            lock(&self.runs).push((script.path.clone(), script.source.clone()));
            if lock(&self.failing).contains(&script.path) {
                return Err(ExecutionError::new(
                    script.path,
                    anyhow!("script failed on purpose"),
                ));
            }
            Ok(())
        }
        .boxed()
    }
}
