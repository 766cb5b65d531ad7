// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod host;
pub mod logging;
pub mod patterns;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{effective_patterns, spawn_config_watcher, user_directory, ConfigPaths};
use crate::engine::{EngineEvent, Reconciler, Runtime, RuntimeOptions};
use crate::exec::ShellScriptEngine;
use crate::fs::RealFileSystem;
use crate::host::{CliHost, Host};
use crate::patterns::{resolve, VariableExpander};
use crate::watch::NotifyBackend;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - scope files and the CLI host
/// - the shell script engine
/// - the reconciler and its runtime loop
/// - the settings watcher (disabled in --once mode)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let workspace = args
        .workspace
        .canonicalize()
        .with_context(|| format!("workspace {:?} does not exist", args.workspace))?;
    let folder = args
        .folder
        .as_deref()
        .map(std::path::absolute)
        .transpose()
        .context("resolving --folder")?;

    let paths = ConfigPaths::for_workspace(&workspace, folder.as_deref(), args.user_config.clone());
    let defaults = (!args.defaults.is_empty()).then(|| args.defaults.clone());
    let host = Arc::new(CliHost::new(
        paths.clone(),
        defaults,
        workspace.clone(),
        user_directory(),
    ));

    // The interpreter is fixed for the lifetime of the process.
    let interpreter = match host.reload() {
        Ok(scopes) => scopes.interpreter().unwrap_or_default(),
        Err(err) => {
            warn!(error = %err, "cannot read settings at startup; using default interpreter");
            Vec::new()
        }
    };

    if args.dry_run {
        return print_dry_run(host, workspace, interpreter).await;
    }

    let engine = Arc::new(ShellScriptEngine::new(interpreter));
    let (tx, rx) = mpsc::unbounded_channel::<EngineEvent>();

    let reconciler = Arc::new(Reconciler::new(
        host,
        Arc::new(RealFileSystem),
        engine,
        Arc::new(NotifyBackend::new()?),
        tx.clone(),
        workspace.clone(),
    ));

    let _config_watcher = if !args.once {
        Some(spawn_config_watcher(paths.all(), tx.clone())?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(EngineEvent::ShutdownRequested);
        });
    }

    info!(workspace = %workspace.display(), "activating");

    let runtime = Runtime::new(reconciler, rx, RuntimeOptions { once: args.once });
    runtime.run().await?;
    Ok(())
}

/// Print effective patterns, their expansions and matched files.
async fn print_dry_run(
    host: Arc<CliHost>,
    workspace: PathBuf,
    interpreter: Vec<String>,
) -> Result<()> {
    let inspection = host.inspect_scripts()?;
    let patterns = effective_patterns(&inspection);
    let expander = VariableExpander::new(host.clone());

    println!("autoscripts dry-run");
    println!("  workspace = {}", workspace.display());
    if interpreter.is_empty() {
        println!("  interpreter = (default)");
    } else {
        println!("  interpreter = {:?}", interpreter);
    }
    println!();

    println!("patterns ({}):", patterns.len());
    for pattern in &patterns {
        println!("  - {pattern}");
        let expanded = match expander.expand(pattern).await {
            Ok(expanded) => expanded,
            Err(err) => {
                println!("      error: {err}");
                continue;
            }
        };
        if expanded != *pattern {
            println!("      expanded: {expanded}");
        }
        match resolve(&RealFileSystem, &workspace, &expanded) {
            Ok(paths) if paths.is_empty() => println!("      (no matches)"),
            Ok(paths) => {
                for path in paths {
                    println!("      {}", path.display());
                }
            }
            Err(err) => println!("      error: {err}"),
        }
    }

    Ok(())
}
