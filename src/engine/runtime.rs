// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::Result;

use super::reconcile::{Reconciler, RunOutcome};
use super::{EngineEvent, RuntimeOptions};

/// Drives the [`Reconciler`] in response to [`EngineEvent`]s.
///
/// Cycles and re-runs are spawned onto a `JoinSet` so that a slow script
/// never blocks the loop; a configuration change arriving mid-cycle starts
/// the next cycle right away.
pub struct Runtime {
    reconciler: Arc<Reconciler>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent>,
    options: RuntimeOptions,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("reconciler", &self.reconciler)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        reconciler: Arc<Reconciler>,
        event_rx: mpsc::UnboundedReceiver<EngineEvent>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            reconciler,
            event_rx,
            options,
        }
    }

    /// Activate, then process events until shutdown or until the event
    /// channel closes; deactivate on the way out.
    ///
    /// In `once` mode only the activation cycle runs; any error it reports
    /// makes this return `Err`.
    pub async fn run(mut self) -> Result<()> {
        info!("autoscripts runtime started");

        if self.options.once {
            let report = self.reconciler.run_cycle().await;
            self.reconciler.deactivate();
            if !report.is_clean() {
                for err in &report.errors {
                    warn!(error = %err, "cycle error");
                }
                return Err(anyhow!(
                    "{} error(s) in reconciliation cycle {}",
                    report.errors.len(),
                    report.generation
                )
                .into());
            }
            return Ok(());
        }

        let mut tasks = JoinSet::new();
        self.spawn_cycle(&mut tasks);

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        info!("engine event channel closed; exiting");
                        break;
                    };
                    debug!(?event, "runtime received event");
                    if !self.handle_event(event, &mut tasks) {
                        info!("shutdown requested");
                        break;
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(err) = joined {
                        warn!(error = %err, "engine task did not complete");
                    }
                }
            }
        }

        tasks.shutdown().await;
        self.reconciler.deactivate();
        info!("runtime exiting");
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    fn handle_event(&self, event: EngineEvent, tasks: &mut JoinSet<()>) -> bool {
        match event {
            EngineEvent::ConfigChanged => {
                info!("configuration changed");
                self.spawn_cycle(tasks);
            }
            EngineEvent::ScriptChanged { path, watch } => {
                let reconciler = Arc::clone(&self.reconciler);
                tasks.spawn(async move {
                    match reconciler.rerun(&path, watch).await {
                        Ok(RunOutcome::Executed) => {
                            info!(path = %path.display(), "script re-run after change");
                        }
                        Ok(_) | Err(_) => {}
                    }
                });
            }
            EngineEvent::WatchFailed {
                path,
                watch,
                reason,
            } => {
                self.reconciler.handle_watch_failure(&path, watch, &reason);
            }
            EngineEvent::ShutdownRequested => return false,
        }
        true
    }

    fn spawn_cycle(&self, tasks: &mut JoinSet<()>) {
        let reconciler = Arc::clone(&self.reconciler);
        tasks.spawn(async move {
            let report = reconciler.run_cycle().await;
            for err in &report.errors {
                debug!(generation = %report.generation, error = %err, "cycle error");
            }
        });
    }
}
