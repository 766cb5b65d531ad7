// src/patterns/resolve.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use tracing::{debug, trace};

use crate::errors::ResolutionError;
use crate::fs::FileSystem;
use crate::patterns::path_utils::to_slash;
use crate::types::ScriptPath;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Expand a fully substituted glob into the sorted list of matching files.
///
/// Shell semantics: `*`, `?`, `[..]` and `{a,b}` stay within one path
/// component, `**` spans directories without following symlinked
/// directories. Names starting with `.` only match pattern components that
/// start with `.`. Relative patterns are anchored at `base_dir`. A pattern
/// whose literal directory prefix does not exist matches nothing; it is not
/// an error.
pub fn resolve(
    fs: &dyn FileSystem,
    base_dir: &Path,
    pattern: &str,
) -> Result<Vec<ScriptPath>, ResolutionError> {
    let absolute = absolutize(base_dir, pattern);

    let matcher = GlobBuilder::new(&absolute)
        .literal_separator(true)
        .build()
        .map_err(|source| ResolutionError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?
        .compile_matcher();

    let (root, remaining) = split_literal_prefix(&absolute);

    if remaining.is_empty() {
        // No wildcards at all: the pattern names a single file.
        return Ok(if fs.is_file(&root) { vec![root] } else { Vec::new() });
    }

    if !fs.is_dir(&root) {
        debug!(%pattern, root = %root.display(), "glob root does not exist");
        return Ok(Vec::new());
    }

    let recursive = remaining.iter().any(|c| c.contains("**"));
    let max_depth = if recursive { usize::MAX } else { remaining.len() };

    let mut matches = BTreeSet::new();
    let mut stack = vec![(root, 0usize)];

    while let Some((dir, depth)) = stack.pop() {
        let entries = fs
            .read_dir(&dir)
            .map_err(|source| ResolutionError::Traversal {
                pattern: pattern.to_string(),
                dir: dir.clone(),
                source: source.into(),
            })?;

        for path in entries {
            if fs.is_dir(&path) {
                if depth + 1 >= max_depth || !dot_allowed(&path, &remaining, depth, false) {
                    continue;
                }
                if recursive && fs.is_symlink(&path) {
                    trace!(dir = %path.display(), "not following symlinked directory");
                    continue;
                }
                stack.push((path, depth + 1));
            } else if fs.is_file(&path)
                && dot_allowed(&path, &remaining, depth, true)
                && matcher.is_match(to_slash(&path))
            {
                matches.insert(path);
            }
        }
    }

    let matches: Vec<ScriptPath> = matches.into_iter().collect();
    debug!(%pattern, count = matches.len(), "resolved glob");
    Ok(matches)
}

/// Wildcards skip names starting with `.` unless the pattern component that
/// would match the entry starts with `.` as well.
fn dot_allowed(path: &Path, remaining: &[&str], depth: usize, is_file: bool) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));
    if !hidden {
        return true;
    }

    let dotted = |c: &&str| c.starts_with('.');
    if !remaining.iter().any(|c| c.contains("**")) {
        return remaining.get(depth).is_some_and(dotted);
    }
    if is_file {
        return remaining.last().is_some_and(dotted);
    }
    // Under `**` any directory component of the pattern may be the one.
    remaining[..remaining.len().saturating_sub(1)]
        .iter()
        .filter(|c| !c.contains("**"))
        .any(dotted)
}

fn absolutize(base_dir: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let relative = pattern.strip_prefix("./").unwrap_or(pattern);
    let base = to_slash(base_dir);
    format!("{}/{}", base.trim_end_matches('/'), relative)
}

/// Split an absolute slash-separated pattern into the directory made of its
/// wildcard-free leading components and the remaining components.
fn split_literal_prefix(pattern: &str) -> (PathBuf, Vec<&str>) {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal_len = components
        .iter()
        .position(|c| c.contains(GLOB_META))
        .unwrap_or(components.len());

    let prefix = components[..literal_len].join("/");
    let root = if prefix.is_empty() {
        PathBuf::from("/")
    } else {
        PathBuf::from(prefix)
    };

    (root, components[literal_len..].to_vec())
}
