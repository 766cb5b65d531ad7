// src/patterns/path_utils.rs

use std::path::Path;

/// Render a path with forward slashes, the separator glob patterns use.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
