use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use autoscripts::config::ScriptsInspection;
use autoscripts::errors::ConfigError;
use autoscripts::host::Host;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::oneshot;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// A scripted [`Host`]:
/// - `scripts` per scope is whatever the test last set
/// - `${env:..}` reads only the variables set on this host
/// - `${command:..}` returns canned values or errors, optionally held back
///   until the test releases them.
#[derive(Default)]
pub struct FakeHost {
    inspection: Mutex<ScriptsInspection>,
    config_broken: AtomicBool,
    env: Mutex<HashMap<String, String>>,
    commands: Mutex<HashMap<String, Result<Value, String>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inspection(inspection: ScriptsInspection) -> Self {
        let host = Self::new();
        host.set_inspection(inspection);
        host
    }

    pub fn set_inspection(&self, inspection: ScriptsInspection) {
        *lock(&self.inspection) = inspection;
    }

    /// Shorthand: only the workspace scope sets `scripts`.
    pub fn set_workspace_scripts(&self, patterns: &[&str]) {
        self.set_inspection(ScriptsInspection {
            workspace_value: Some(patterns.iter().map(|p| p.to_string()).collect()),
            ..ScriptsInspection::default()
        });
    }

    /// Make `inspect_scripts` fail until called again with `false`.
    pub fn set_config_broken(&self, broken: bool) {
        self.config_broken.store(broken, Ordering::SeqCst);
    }

    pub fn set_env(&self, name: &str, value: &str) {
        lock(&self.env).insert(name.to_string(), value.to_string());
    }

    pub fn set_command(&self, id: &str, value: Value) {
        lock(&self.commands).insert(id.to_string(), Ok(value));
    }

    pub fn fail_command(&self, id: &str, message: &str) {
        lock(&self.commands).insert(id.to_string(), Err(message.to_string()));
    }

    /// Hold the next invocation of `id` until the returned sender fires (or
    /// is dropped).
    pub fn gate_command(&self, id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        lock(&self.gates).insert(id.to_string(), rx);
        tx
    }

    /// Command ids in invocation order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

impl Host for FakeHost {
    fn inspect_scripts(&self) -> Result<ScriptsInspection, ConfigError> {
        if self.config_broken.load(Ordering::SeqCst) {
            return Err(ConfigError::Io {
                path: PathBuf::from("settings.toml"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "settings unreadable"),
            });
        }
        Ok(lock(&self.inspection).clone())
    }

    fn env_var(&self, name: &str) -> Option<String> {
        lock(&self.env).get(name).cloned()
    }

    fn execute_command<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Value>> {
        lock(&self.calls).push(id.to_string());
        let gate = lock(&self.gates).remove(id);

        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            match lock(&self.commands).get(id) {
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err(message)) => Err(anyhow!("{message}")),
                None => Err(anyhow!("command '{id}' not found")),
            }
        }
        .boxed()
    }
}
