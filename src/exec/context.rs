// src/exec/context.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::exec::function_code::function_code;
use crate::fs::FileSystem;
use crate::host::Host;
use crate::types::ScriptPath;

/// What a script writes through [`ScriptContext::output`].
#[derive(Debug, Clone, PartialEq)]
pub enum OutputContent {
    /// Written verbatim.
    Text(String),
    /// Written as pretty-printed JSON.
    Json(Value),
}

impl OutputContent {
    pub fn render(&self) -> Result<String> {
        match self {
            OutputContent::Text(text) => Ok(text.clone()),
            OutputContent::Json(value) => {
                serde_json::to_string_pretty(value).context("serializing output as JSON")
            }
        }
    }
}

impl From<String> for OutputContent {
    fn from(text: String) -> Self {
        OutputContent::Text(text)
    }
}

impl From<&str> for OutputContent {
    fn from(text: &str) -> Self {
        OutputContent::Text(text.to_string())
    }
}

impl From<Value> for OutputContent {
    fn from(value: Value) -> Self {
        OutputContent::Json(value)
    }
}

/// Capabilities offered to a running script.
///
/// Built fresh for every execution; cloning is cheap.
#[derive(Clone)]
pub struct ScriptContext {
    host: Arc<dyn Host>,
    fs: Arc<dyn FileSystem>,
    script_path: ScriptPath,
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("script_path", &self.script_path)
            .finish_non_exhaustive()
    }
}

impl ScriptContext {
    pub fn new(host: Arc<dyn Host>, fs: Arc<dyn FileSystem>, script_path: ScriptPath) -> Self {
        Self {
            host,
            fs,
            script_path,
        }
    }

    /// The host handle, passed through untouched.
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Directory containing the script.
    pub fn script_dir(&self) -> &Path {
        self.script_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Absolute paths are kept; relative ones are taken from the script's
    /// directory.
    pub fn resolve_output_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.script_dir().join(path)
        }
    }

    /// Write `content` to `path` and wait for the write to complete.
    pub async fn output(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<OutputContent>,
    ) -> Result<()> {
        let target = self.resolve_output_path(path);
        let rendered = content.into().render()?;
        let fs = Arc::clone(&self.fs);

        debug!(script = %self.script_path.display(), target = %target.display(), "script output");

        let write_target = target.clone();
        tokio::task::spawn_blocking(move || fs.write(&write_target, rendered.as_bytes()))
            .await
            .with_context(|| format!("output task for {:?} panicked", target))??;
        Ok(())
    }

    /// De-indented body of the callable whose source text is `source`.
    pub fn function_code(&self, source: &str) -> String {
        function_code(source)
    }
}
