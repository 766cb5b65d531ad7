// src/config/mod.rs

//! Configuration scopes for autoscripts.
//!
//! Responsibilities:
//! - Define the TOML-backed scope file (`model.rs`).
//! - Load the scope files from disk (`loader.rs`).
//! - Decide which scopes are in effect (`scopes.rs`).
//! - Notice edits of the scope files (`watcher.rs`).

pub mod loader;
pub mod model;
pub mod scopes;
pub mod watcher;

pub use loader::{load_scope, load_scopes, user_directory, ConfigPaths, LoadedScopes};
pub use model::ScopeFile;
pub use scopes::{effective_patterns, ScriptsInspection};
pub use watcher::{spawn_config_watcher, ConfigWatcherHandle};
