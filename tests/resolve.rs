// tests/resolve.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use autoscripts::errors::ResolutionError;
use autoscripts::fs::mock::MockFileSystem;
use autoscripts::fs::RealFileSystem;
use autoscripts::patterns::resolve;

type TestResult = Result<(), Box<dyn Error>>;

fn mock_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/scripts/a.js", "1");
    fs.add_file("/ws/scripts/b.js", "2");
    fs.add_file("/ws/scripts/c.sh", "3");
    fs.add_file("/ws/scripts/nested/d.js", "4");
    fs.add_file("/ws/scripts/nested/deeper/e.js", "5");
    fs.add_file("/ws/other/f.js", "6");
    fs
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

#[test]
fn star_stays_within_one_directory() -> TestResult {
    let fs = mock_tree();

    let found = resolve(&fs, Path::new("/ws"), "scripts/*.js")?;

    assert_eq!(found, paths(&["/ws/scripts/a.js", "/ws/scripts/b.js"]));
    Ok(())
}

#[test]
fn double_star_crosses_directories() -> TestResult {
    let fs = mock_tree();

    let found = resolve(&fs, Path::new("/ws"), "scripts/**/*.js")?;

    assert_eq!(
        found,
        paths(&[
            "/ws/scripts/a.js",
            "/ws/scripts/b.js",
            "/ws/scripts/nested/d.js",
            "/ws/scripts/nested/deeper/e.js",
        ])
    );
    Ok(())
}

#[test]
fn braces_classes_and_question_marks() -> TestResult {
    let fs = mock_tree();
    let ws = Path::new("/ws");

    assert_eq!(
        resolve(&fs, ws, "scripts/*.{sh,js}")?.len(),
        3,
        "brace alternatives"
    );
    assert_eq!(resolve(&fs, ws, "scripts/[ab].js")?, paths(&["/ws/scripts/a.js", "/ws/scripts/b.js"]));
    assert_eq!(resolve(&fs, ws, "scripts/?.sh")?, paths(&["/ws/scripts/c.sh"]));
    assert_eq!(resolve(&fs, ws, "*/f.js")?, paths(&["/ws/other/f.js"]));
    Ok(())
}

#[test]
fn absolute_patterns_ignore_the_base_dir() -> TestResult {
    let fs = mock_tree();

    let found = resolve(&fs, Path::new("/elsewhere"), "/ws/other/*.js")?;

    assert_eq!(found, paths(&["/ws/other/f.js"]));
    Ok(())
}

#[test]
fn literal_pattern_names_a_single_file() -> TestResult {
    let fs = mock_tree();
    let ws = Path::new("/ws");

    assert_eq!(resolve(&fs, ws, "./scripts/c.sh")?, paths(&["/ws/scripts/c.sh"]));
    assert!(resolve(&fs, ws, "scripts/missing.sh")?.is_empty());
    // Directories are never returned.
    assert!(resolve(&fs, ws, "scripts/nested")?.is_empty());
    Ok(())
}

#[test]
fn missing_root_matches_nothing() -> TestResult {
    let fs = mock_tree();

    assert!(resolve(&fs, Path::new("/ws"), "nope/**/*.js")?.is_empty());
    assert!(resolve(&fs, Path::new("/ws"), "/s/*.js")?.is_empty());
    Ok(())
}

#[test]
fn invalid_glob_is_reported() {
    let fs = mock_tree();

    let err = resolve(&fs, Path::new("/ws"), "scripts/[a.js").unwrap_err();

    assert!(matches!(err, ResolutionError::InvalidPattern { ref pattern, .. } if pattern == "scripts/[a.js"));
}

#[test]
fn unreadable_directory_is_a_traversal_error() {
    let fs = mock_tree();
    fs.deny_read_dir("/ws/scripts/nested");

    let err = resolve(&fs, Path::new("/ws"), "scripts/**/*.js").unwrap_err();

    match err {
        ResolutionError::Traversal { dir, .. } => assert_eq!(dir, PathBuf::from("/ws/scripts/nested")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn resolves_against_the_real_filesystem() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().canonicalize()?;
    fs::create_dir_all(root.join("scripts/sub"))?;
    fs::write(root.join("scripts/one.sh"), "echo 1")?;
    fs::write(root.join("scripts/two.sh"), "echo 2")?;
    fs::write(root.join("scripts/sub/three.sh"), "echo 3")?;
    fs::write(root.join("scripts/notes.txt"), "")?;

    let flat = resolve(&RealFileSystem, &root, "scripts/*.sh")?;
    let deep = resolve(&RealFileSystem, &root, "scripts/**/*.sh")?;

    assert_eq!(flat, vec![root.join("scripts/one.sh"), root.join("scripts/two.sh")]);
    assert_eq!(deep.len(), 3);
    assert!(deep.iter().all(|p| p.is_absolute()));
    Ok(())
}

#[test]
fn wildcards_skip_dot_files_and_dot_directories() -> TestResult {
    let fs = mock_tree();
    fs.add_file("/ws/scripts/.a.js.swp.js", "swap");
    fs.add_file("/ws/scripts/.cache/g.js", "7");
    fs.add_file("/ws/scripts/.hooks/pre.sh", "8");
    let ws = Path::new("/ws");

    assert_eq!(resolve(&fs, ws, "scripts/*.js")?, paths(&["/ws/scripts/a.js", "/ws/scripts/b.js"]));
    assert_eq!(resolve(&fs, ws, "scripts/**/*.js")?.len(), 4);
    assert_eq!(resolve(&fs, ws, "scripts/*/*.js")?, paths(&["/ws/scripts/nested/d.js"]));
    Ok(())
}

#[test]
fn dotted_pattern_components_match_dot_entries() -> TestResult {
    let fs = mock_tree();
    fs.add_file("/ws/scripts/.a.js.swp.js", "swap");
    fs.add_file("/ws/scripts/.hooks/pre.sh", "8");
    let ws = Path::new("/ws");

    assert_eq!(resolve(&fs, ws, "scripts/.*.js")?, paths(&["/ws/scripts/.a.js.swp.js"]));
    assert_eq!(resolve(&fs, ws, "scripts/.hooks/*.sh")?, paths(&["/ws/scripts/.hooks/pre.sh"]));
    assert_eq!(resolve(&fs, ws, "*/.hooks/*.sh")?, paths(&["/ws/scripts/.hooks/pre.sh"]));
    Ok(())
}

#[cfg(unix)]
#[test]
fn double_star_does_not_follow_symlink_cycles() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().canonicalize()?;
    fs::create_dir_all(root.join("scripts/sub"))?;
    fs::write(root.join("scripts/sub/a.js"), "1")?;
    std::os::unix::fs::symlink(root.join("scripts"), root.join("scripts/sub/loop"))?;

    let found = resolve(&RealFileSystem, &root, "scripts/**/*.js")?;

    assert_eq!(found, vec![root.join("scripts/sub/a.js")]);
    Ok(())
}

#[cfg(unix)]
#[test]
fn single_star_still_enters_symlinked_directories() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().canonicalize()?;
    fs::create_dir_all(root.join("shared"))?;
    fs::create_dir_all(root.join("scripts"))?;
    fs::write(root.join("shared/b.js"), "2")?;
    std::os::unix::fs::symlink(root.join("shared"), root.join("scripts/linked"))?;

    let found = resolve(&RealFileSystem, &root, "scripts/*/*.js")?;

    assert_eq!(found, vec![root.join("scripts/linked/b.js")]);
    Ok(())
}
