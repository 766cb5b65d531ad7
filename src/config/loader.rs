// src/config/loader.rs

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::ScopeFile;
use crate::config::scopes::ScriptsInspection;
use crate::errors::ConfigError;

/// Directory holding a workspace's (or workspace folder's) settings.
pub const SETTINGS_DIR: &str = ".autoscripts";

/// Settings file name, at every scope.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Name of the per-user directory under the platform config dir.
pub const USER_DIR_NAME: &str = "autoscripts";

/// `<config dir>/autoscripts`, e.g. `~/.config/autoscripts` on Linux.
pub fn user_directory() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_DIR_NAME))
}

/// Locations of the three file-backed scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPaths {
    pub global: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
    pub workspace_folder: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard layout for a workspace, an optional active folder and an
    /// optional explicit user settings file.
    pub fn for_workspace(
        workspace: &Path,
        folder: Option<&Path>,
        user_config: Option<PathBuf>,
    ) -> Self {
        let global = user_config.or_else(|| user_directory().map(|dir| dir.join(SETTINGS_FILE)));
        Self {
            global,
            workspace: Some(workspace.join(SETTINGS_DIR).join(SETTINGS_FILE)),
            workspace_folder: folder.map(|f| f.join(SETTINGS_DIR).join(SETTINGS_FILE)),
        }
    }

    /// Every configured settings file path.
    pub fn all(&self) -> Vec<PathBuf> {
        [&self.global, &self.workspace, &self.workspace_folder]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

/// Load one scope file. A missing file is "scope not set", not an error.
pub fn load_scope(path: impl AsRef<Path>) -> Result<Option<ScopeFile>, ConfigError> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings file absent");
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let scope: ScopeFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(scope))
}

/// All scopes as loaded at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedScopes {
    pub default_scripts: Option<Vec<String>>,
    pub global: Option<ScopeFile>,
    pub workspace: Option<ScopeFile>,
    pub workspace_folder: Option<ScopeFile>,
}

impl LoadedScopes {
    /// From least to most specific.
    fn files(&self) -> impl Iterator<Item = &ScopeFile> {
        [&self.global, &self.workspace, &self.workspace_folder]
            .into_iter()
            .flatten()
    }

    pub fn inspection(&self) -> ScriptsInspection {
        let scripts = |scope: &Option<ScopeFile>| scope.as_ref().and_then(|s| s.scripts.clone());
        ScriptsInspection {
            default_value: self.default_scripts.clone(),
            global_value: scripts(&self.global),
            workspace_value: scripts(&self.workspace),
            workspace_folder_value: scripts(&self.workspace_folder),
        }
    }

    /// `[commands]` of every scope, more specific scopes overriding.
    pub fn commands(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for scope in self.files() {
            merged.extend(scope.commands.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    /// Most specific `interpreter` setting.
    pub fn interpreter(&self) -> Option<Vec<String>> {
        self.files()
            .filter_map(|scope| scope.interpreter.clone())
            .last()
    }
}

/// Load every file-backed scope listed in `paths`.
pub fn load_scopes(
    paths: &ConfigPaths,
    default_scripts: Option<Vec<String>>,
) -> Result<LoadedScopes, ConfigError> {
    let load = |path: &Option<PathBuf>| match path {
        Some(path) => load_scope(path),
        None => Ok(None),
    };

    Ok(LoadedScopes {
        default_scripts,
        global: load(&paths.global)?,
        workspace: load(&paths.workspace)?,
        workspace_folder: load(&paths.workspace_folder)?,
    })
}
