use std::fmt;
use std::path::PathBuf;

/// Absolute path of a script; the identity key of both the content cache and
/// the watch registry.
pub type ScriptPath = PathBuf;

/// Reconciliation cycle identifier.
///
/// Incremented exactly once per cycle by the
/// [`Reconciler`](crate::engine::Reconciler); never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub const fn new(value: u64) -> Self {
        Generation(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one OS watch handle created by the registry.
///
/// Events carry it so a notification from a handle that has since been
/// closed (and possibly replaced) can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
