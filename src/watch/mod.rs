// src/watch/mod.rs

//! Script watching and change detection.
//!
//! This module is responsible for:
//! - Hashing script contents so unchanged scripts are not re-run ([`cache`]).
//! - Owning one OS watch per matched script, stamped with the generation of
//!   the cycle that last matched it ([`registry`]).
//! - Wiring those watches to `notify` and forwarding their events to the
//!   runtime ([`watcher`]).
//!
//! It does **not** know about configuration or globs; the reconciler decides
//! which paths are watched.

pub mod cache;
pub mod hash;
pub mod registry;
pub mod watcher;

pub use cache::ContentCache;
pub use hash::ContentHash;
pub use registry::{WatchRegistry, WatchStatus};
pub use watcher::{NotifyBackend, WatchBackend, WatchHandle, WatchNotifier};
