// src/host/mod.rs

//! The environment the engine runs in.
//!
//! The engine needs three things from its host: the configured `scripts`
//! per scope, environment variables for `${env:..}`, and a command facility
//! for `${command:..}`. The same handle is passed through, untouched, to
//! every script as part of its [`ScriptContext`](crate::exec::ScriptContext).

use futures::future::BoxFuture;
use serde_json::Value;

use crate::config::ScriptsInspection;
use crate::errors::ConfigError;

pub mod cli;

pub use cli::CliHost;

/// Built-in command returning the per-user autoscripts directory.
pub const USER_DIRECTORY_COMMAND: &str = "autoscripts.getUserDirectory";

pub trait Host: Send + Sync {
    /// Current `scripts` value at every scope.
    fn inspect_scripts(&self) -> Result<ScriptsInspection, ConfigError>;

    /// Environment lookup for `${env:NAME}`.
    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    /// Run the command registered under `id` and return its result.
    fn execute_command<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Value>>;
}
