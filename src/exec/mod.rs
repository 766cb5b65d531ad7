// src/exec/mod.rs

//! Script execution layer.
//!
//! - [`ScriptEngine`] is the seam between the reconciler and whatever actually
//!   runs a script; tests replace it with a recording fake.
//! - [`context`] holds the [`ScriptContext`] capability object handed to
//!   every execution.
//! - [`function_code`] extracts the body of a callable from its source.
//! - [`shell`] is the process-backed engine used by the binary.

use futures::future::BoxFuture;

use crate::errors::ExecutionError;
use crate::types::ScriptPath;

pub mod context;
pub mod function_code;
pub mod shell;

pub use context::{OutputContent, ScriptContext};
pub use function_code::{dedent, function_code};
pub use shell::{parse_directive, Directive, ShellScriptEngine, DEFAULT_INTERPRETER};

/// A script as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub path: ScriptPath,
    pub source: String,
}

impl Script {
    pub fn new(path: impl Into<ScriptPath>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Runs one script with the capabilities in `context`.
///
/// Implementations must not panic on script failure; every failure is an
/// [`ExecutionError`].
pub trait ScriptEngine: Send + Sync {
    fn execute(
        &self,
        script: Script,
        context: ScriptContext,
    ) -> BoxFuture<'_, Result<(), ExecutionError>>;
}
