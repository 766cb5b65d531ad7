// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Contents of one scope's `settings.toml`.
///
/// ```toml
/// scripts = ["scripts/*.sh", "${env:HOME}/.autoscripts/*.sh"]
/// interpreter = ["bash", "-s"]
///
/// [commands]
/// "git.root" = "git rev-parse --show-toplevel"
/// ```
///
/// Every key is optional. A scope "sets" `scripts` only if the key is
/// present, even as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScopeFile {
    /// Glob patterns of scripts to run and watch.
    #[serde(default)]
    pub scripts: Option<Vec<String>>,

    /// Program (plus arguments) that receives a script on stdin when the
    /// script has no `#!` line.
    #[serde(default)]
    pub interpreter: Option<Vec<String>>,

    /// Shell commands usable as `${command:<id>}` placeholders; the
    /// placeholder is replaced with the command's stdout.
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}
