// tests/config_scopes.rs

use std::error::Error;
use std::fs;
use std::path::Path;

use autoscripts::config::{
    effective_patterns, load_scope, load_scopes, ConfigPaths, ScriptsInspection,
};
use autoscripts::errors::ConfigError;
use autoscripts_test_utils::InspectionBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn default_applies_only_when_no_override_is_present() {
    let only_default = InspectionBuilder::new().default_value(&["d/*.js"]).build();
    assert_eq!(effective_patterns(&only_default), strings(&["d/*.js"]));

    let with_workspace = InspectionBuilder::new()
        .default_value(&["d/*.js"])
        .workspace(&["w/*.js"])
        .build();
    assert_eq!(effective_patterns(&with_workspace), strings(&["w/*.js"]));
}

#[test]
fn present_overrides_combine_in_scope_order() {
    let inspection = InspectionBuilder::new()
        .default_value(&["d/*.js"])
        .global(&["g/*.js"])
        .workspace(&["w/*.js"])
        .workspace_folder(&["f/*.js"])
        .build();

    assert_eq!(
        effective_patterns(&inspection),
        strings(&["g/*.js", "f/*.js", "w/*.js"])
    );
}

#[test]
fn an_empty_override_still_counts_as_present() {
    let inspection = InspectionBuilder::new()
        .default_value(&["d/*.js"])
        .global(&[])
        .build();

    assert!(effective_patterns(&inspection).is_empty());
}

#[test]
fn nothing_set_means_no_patterns() {
    assert!(effective_patterns(&ScriptsInspection::default()).is_empty());
}

fn write_settings(dir: &Path, body: &str) -> std::io::Result<()> {
    fs::create_dir_all(dir.join(".autoscripts"))?;
    fs::write(dir.join(".autoscripts/settings.toml"), body)
}

#[test]
fn load_scope_reads_all_keys_and_tolerates_missing_files() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let file = tmp.path().join("settings.toml");
    fs::write(
        &file,
        r#"
scripts = ["scripts/*.sh"]
interpreter = ["bash", "-s"]

[commands]
"git.root" = "git rev-parse --show-toplevel"
"#,
    )?;

    let scope = load_scope(&file)?.expect("file exists");
    assert_eq!(scope.scripts, Some(strings(&["scripts/*.sh"])));
    assert_eq!(scope.interpreter, Some(strings(&["bash", "-s"])));
    assert_eq!(
        scope.commands.get("git.root").map(String::as_str),
        Some("git rev-parse --show-toplevel")
    );

    assert!(load_scope(tmp.path().join("absent.toml"))?.is_none());
    Ok(())
}

#[test]
fn unset_scripts_key_is_not_present() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let file = tmp.path().join("settings.toml");
    fs::write(&file, "interpreter = [\"bash\"]\n")?;

    let scope = load_scope(&file)?.expect("file exists");
    assert_eq!(scope.scripts, None);
    Ok(())
}

#[test]
fn malformed_settings_are_a_parse_error() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let file = tmp.path().join("settings.toml");
    fs::write(&file, "scripts = \"not a list\"\n")?;

    let err = load_scope(&file).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { ref path, .. } if *path == file));
    Ok(())
}

#[test]
fn load_scopes_merges_commands_and_interpreter_by_specificity() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let workspace = tmp.path().join("ws");
    let folder = workspace.join("pkg");
    let user = tmp.path().join("user.toml");

    fs::write(
        &user,
        r#"
scripts = ["${env:HOME}/global/*.sh"]
interpreter = ["zsh", "-s"]
[commands]
shared = "echo user"
only_user = "echo u"
"#,
    )?;
    write_settings(
        &workspace,
        r#"
scripts = ["scripts/*.sh"]
[commands]
shared = "echo workspace"
"#,
    )?;
    write_settings(&folder, "interpreter = [\"bash\", \"-s\"]\n")?;

    let paths = ConfigPaths::for_workspace(&workspace, Some(folder.as_path()), Some(user.clone()));
    assert_eq!(paths.all().len(), 3);

    let scopes = load_scopes(&paths, Some(strings(&["default/*.sh"])))?;

    let inspection = scopes.inspection();
    assert_eq!(inspection.default_value, Some(strings(&["default/*.sh"])));
    assert_eq!(inspection.global_value, Some(strings(&["${env:HOME}/global/*.sh"])));
    assert_eq!(inspection.workspace_value, Some(strings(&["scripts/*.sh"])));
    assert_eq!(inspection.workspace_folder_value, None);

    let commands = scopes.commands();
    assert_eq!(commands["shared"], "echo workspace");
    assert_eq!(commands["only_user"], "echo u");

    assert_eq!(scopes.interpreter(), Some(strings(&["bash", "-s"])));
    Ok(())
}

#[test]
fn standard_paths_layout() {
    let paths = ConfigPaths::for_workspace(
        Path::new("/ws"),
        Some(Path::new("/ws/pkg")),
        Some("/home/me/autoscripts.toml".into()),
    );

    assert_eq!(paths.global.as_deref(), Some(Path::new("/home/me/autoscripts.toml")));
    assert_eq!(
        paths.workspace.as_deref(),
        Some(Path::new("/ws/.autoscripts/settings.toml"))
    );
    assert_eq!(
        paths.workspace_folder.as_deref(),
        Some(Path::new("/ws/pkg/.autoscripts/settings.toml"))
    );
}
