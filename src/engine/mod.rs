// src/engine/mod.rs

//! Reconciliation engine for autoscripts.
//!
//! This module ties together:
//! - the [`Reconciler`], which owns the generation counter, the content
//!   cache and the watch registry, and runs one reconciliation cycle at a
//!   time per trigger
//! - the [`Runtime`] event loop that reacts to:
//!   - configuration changes
//!   - script change / watch failure notifications
//!   - shutdown signals

use crate::types::{ScriptPath, WatchId};

pub mod reconcile;
pub mod runtime;

pub use reconcile::{CycleReport, Reconciler, RunOutcome};
pub use runtime::Runtime;

/// Events consumed by the [`Runtime`] loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A scope's settings file changed; start a new cycle.
    ConfigChanged,

    /// A watched script changed on disk.
    ScriptChanged { path: ScriptPath, watch: WatchId },

    /// The OS watch for a script reported an error.
    WatchFailed {
        path: ScriptPath,
        watch: WatchId,
        reason: String,
    },

    /// Ctrl-C or similar: deactivate and stop.
    ShutdownRequested,
}

/// Options that affect the runtime's lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Run the activation cycle only, then deactivate and return.
    pub once: bool,
}
