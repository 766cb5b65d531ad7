// tests/notify_backend.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use autoscripts::engine::EngineEvent;
use autoscripts::types::WatchId;
use autoscripts::watch::{NotifyBackend, WatchBackend, WatchHandle, WatchNotifier};
use autoscripts_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn scripts_dir(count: usize) -> (tempfile::TempDir, Vec<PathBuf>) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().canonicalize().expect("canonical tempdir");
    let paths = (0..count)
        .map(|i| {
            let path = root.join(format!("s{i}.sh"));
            fs::write(&path, format!("echo {i}")).expect("write script");
            path
        })
        .collect();
    (tmp, paths)
}

fn open(
    backend: &NotifyBackend,
    path: &Path,
    id: u64,
    tx: &mpsc::UnboundedSender<EngineEvent>,
) -> Box<dyn WatchHandle> {
    let notifier = WatchNotifier::new(path.to_path_buf(), WatchId(id), tx.clone());
    backend.watch(path, notifier).expect("open watch")
}

async fn next_change(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> EngineEvent {
    with_timeout(rx.recv()).await.expect("event channel open")
}

async fn settle(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) {
    tokio::time::sleep(Duration::from_millis(200)).await;
    while rx.try_recv().is_ok() {}
}

async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) {
    let got = tokio::time::timeout(Duration::from_millis(400), rx.recv()).await;
    assert!(got.is_err(), "unexpected event: {got:?}");
}

#[tokio::test]
async fn hundreds_of_watches_share_one_watcher() -> TestResult {
    init_tracing();
    let (_tmp, paths) = scripts_dir(300);
    let backend = NotifyBackend::new()?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut handles = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        let notifier = WatchNotifier::new(path.clone(), WatchId(i as u64), tx.clone());
        handles.push(backend.watch(path, notifier)?);
    }
    assert_eq!(backend.watched_count(), 300);

    fs::write(&paths[250], "echo edited")?;
    assert_eq!(
        next_change(&mut rx).await,
        EngineEvent::ScriptChanged {
            path: paths[250].clone(),
            watch: WatchId(250),
        }
    );

    for handle in &mut handles {
        handle.close();
    }
    assert_eq!(backend.watched_count(), 0);
    Ok(())
}

#[tokio::test]
async fn closed_watch_reports_nothing() -> TestResult {
    init_tracing();
    let (_tmp, paths) = scripts_dir(1);
    let backend = NotifyBackend::new()?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut handle = open(&backend, &paths[0], 1, &tx);
    handle.close();
    // Closing twice is harmless.
    handle.close();
    settle(&mut rx).await;

    fs::write(&paths[0], "echo edited")?;

    assert_quiet(&mut rx).await;
    Ok(())
}

#[tokio::test]
async fn closing_a_replaced_watch_keeps_the_new_route() -> TestResult {
    init_tracing();
    let (_tmp, paths) = scripts_dir(1);
    let backend = NotifyBackend::new()?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut old = open(&backend, &paths[0], 1, &tx);
    let _new = open(&backend, &paths[0], 2, &tx);
    old.close();
    settle(&mut rx).await;

    fs::write(&paths[0], "echo edited")?;

    assert_eq!(
        next_change(&mut rx).await,
        EngineEvent::ScriptChanged {
            path: paths[0].clone(),
            watch: WatchId(2),
        }
    );
    Ok(())
}

#[tokio::test]
async fn missing_file_cannot_be_watched() -> TestResult {
    let (_tmp, paths) = scripts_dir(1);
    let backend = NotifyBackend::new()?;
    let (tx, _rx) = mpsc::unbounded_channel();
    let missing = paths[0].with_file_name("missing.sh");

    let result = backend.watch(&missing, WatchNotifier::new(missing.clone(), WatchId(7), tx));

    assert!(result.is_err());
    assert_eq!(backend.watched_count(), 0);
    Ok(())
}
