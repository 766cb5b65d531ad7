// src/host/cli.rs

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{load_scopes, ConfigPaths, LoadedScopes, ScriptsInspection};
use crate::errors::ConfigError;
use crate::host::{Host, USER_DIRECTORY_COMMAND};

/// Host backing the `autoscripts` binary.
///
/// Scopes are read from `settings.toml` files (see [`ConfigPaths`]); the
/// default scope comes from the command line. `${command:ID}` resolves to the
/// built-in [`USER_DIRECTORY_COMMAND`] or to a shell command from the
/// `[commands]` tables, run in the workspace directory.
#[derive(Debug)]
pub struct CliHost {
    paths: ConfigPaths,
    default_scripts: Option<Vec<String>>,
    workspace: PathBuf,
    user_dir: Option<PathBuf>,
    scopes: RwLock<LoadedScopes>,
}

impl CliHost {
    pub fn new(
        paths: ConfigPaths,
        default_scripts: Option<Vec<String>>,
        workspace: PathBuf,
        user_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            paths,
            default_scripts,
            workspace,
            user_dir,
            scopes: RwLock::new(LoadedScopes::default()),
        }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Re-read every scope file and remember the result.
    pub fn reload(&self) -> Result<LoadedScopes, ConfigError> {
        let scopes = load_scopes(&self.paths, self.default_scripts.clone())?;
        let mut guard = self.scopes.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = scopes.clone();
        Ok(scopes)
    }

    /// Scopes as of the last [`reload`](Self::reload).
    pub fn scopes(&self) -> LoadedScopes {
        self.scopes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn user_directory(&self) -> Result<Value> {
        let dir = self
            .user_dir
            .as_ref()
            .ok_or_else(|| anyhow!("cannot determine user directory"))?;
        Ok(Value::String(dir.to_string_lossy().into_owned()))
    }

    async fn run_shell_command(&self, id: &str) -> Result<Value> {
        let Some(cmd) = self.scopes().commands().get(id).cloned() else {
            bail!("command '{id}' not found");
        };

        debug!(command = %id, %cmd, "running placeholder command");

        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&cmd);
            c
        };

        let output = command
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("spawning process for command '{id}'"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "command '{id}' exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value = stdout.trim_end_matches(['\r', '\n']).to_string();
        info!(command = %id, %value, "placeholder command finished");
        Ok(Value::String(value))
    }
}

impl Host for CliHost {
    fn inspect_scripts(&self) -> Result<ScriptsInspection, ConfigError> {
        Ok(self.reload()?.inspection())
    }

    fn execute_command<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Value>> {
        async move {
            if id == USER_DIRECTORY_COMMAND {
                return self.user_directory();
            }
            self.run_shell_command(id).await
        }
        .boxed()
    }
}
