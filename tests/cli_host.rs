// tests/cli_host.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use autoscripts::config::ConfigPaths;
use autoscripts::host::{CliHost, Host, USER_DIRECTORY_COMMAND};

type TestResult = Result<(), Box<dyn Error>>;

fn workspace_with(settings: &str) -> (tempfile::TempDir, PathBuf) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let ws = tmp.path().canonicalize().expect("canonical tempdir");
    fs::create_dir_all(ws.join(".autoscripts")).expect("settings dir");
    fs::write(ws.join(".autoscripts/settings.toml"), settings).expect("settings file");
    (tmp, ws)
}

fn host(ws: &Path, user_dir: Option<PathBuf>) -> CliHost {
    let paths = ConfigPaths::for_workspace(ws, None, Some(ws.join("no-user-settings.toml")));
    CliHost::new(paths, Some(vec!["default/*.sh".into()]), ws.to_path_buf(), user_dir)
}

#[test]
fn inspection_reflects_the_files_on_disk() -> TestResult {
    let (_tmp, ws) = workspace_with("scripts = [\"a/*.sh\"]\n");
    let host = host(&ws, None);

    let first = host.inspect_scripts()?;
    assert_eq!(first.workspace_value, Some(vec!["a/*.sh".to_string()]));
    assert_eq!(first.default_value, Some(vec!["default/*.sh".to_string()]));
    assert_eq!(first.global_value, None);

    fs::write(ws.join(".autoscripts/settings.toml"), "scripts = [\"b/*.sh\"]\n")?;
    let second = host.inspect_scripts()?;
    assert_eq!(second.workspace_value, Some(vec!["b/*.sh".to_string()]));
    Ok(())
}

#[test]
fn broken_settings_are_a_config_error() {
    let (_tmp, ws) = workspace_with("scripts = [");
    assert!(host(&ws, None).inspect_scripts().is_err());
}

#[tokio::test]
async fn user_directory_command() -> TestResult {
    let (_tmp, ws) = workspace_with("");

    let with_dir = host(&ws, Some(PathBuf::from("/home/me/.config/autoscripts")));
    assert_eq!(
        with_dir.execute_command(USER_DIRECTORY_COMMAND).await?,
        json!("/home/me/.config/autoscripts")
    );

    let without_dir = host(&ws, None);
    assert!(without_dir.execute_command(USER_DIRECTORY_COMMAND).await.is_err());
    Ok(())
}

#[tokio::test]
async fn unknown_command_fails() {
    let (_tmp, ws) = workspace_with("");
    let host = host(&ws, None);
    host.reload().expect("settings load");

    let err = host.execute_command("nope").await.unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[cfg(unix)]
#[tokio::test]
async fn configured_commands_run_in_the_workspace() -> TestResult {
    let (_tmp, ws) = workspace_with(
        r#"
[commands]
where = "pwd -P"
fails = "echo bad >&2; exit 1"
"#,
    );
    let host = host(&ws, None);
    host.reload()?;

    assert_eq!(
        host.execute_command("where").await?,
        json!(ws.to_string_lossy())
    );

    let err = host.execute_command("fails").await.unwrap_err();
    assert!(err.to_string().contains("bad"));
    Ok(())
}
