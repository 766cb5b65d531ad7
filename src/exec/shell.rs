// src/exec/shell.rs

//! Process-backed [`ScriptEngine`].
//!
//! The script text is piped to an interpreter (`sh -s` unless the script
//! starts with a `#!` line or another default is configured). Capabilities
//! are reached through directives written to stdout:
//!
//! ```text
//! ::output file=generated/out.txt::line one%0Aline two
//! ::output-json file=data.json::{"answer": 42}
//! ```
//!
//! Any other stdout line is only logged.

use std::collections::VecDeque;
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::ExecutionError;
use crate::exec::context::{OutputContent, ScriptContext};
use crate::exec::{Script, ScriptEngine};

/// Interpreter used for scripts without a `#!` line.
pub const DEFAULT_INTERPRETER: &[&str] = &["sh", "-s"];

/// Environment variable holding the running script's path.
pub const SCRIPT_ENV: &str = "AUTOSCRIPTS_SCRIPT";

/// Environment variable holding the running script's directory.
pub const SCRIPT_DIR_ENV: &str = "AUTOSCRIPTS_SCRIPT_DIR";

/// How many trailing stderr lines are attached to a failure.
const STDERR_TAIL: usize = 20;

/// Capability request parsed from one stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Output { file: String, content: OutputContent },
}

#[derive(Debug, Clone)]
pub struct ShellScriptEngine {
    interpreter: Vec<String>,
}

impl Default for ShellScriptEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ShellScriptEngine {
    /// `interpreter` is the program plus arguments used for scripts without
    /// a `#!` line; empty means [`DEFAULT_INTERPRETER`].
    pub fn new(interpreter: Vec<String>) -> Self {
        let interpreter = if interpreter.is_empty() {
            DEFAULT_INTERPRETER.iter().map(|s| s.to_string()).collect()
        } else {
            interpreter
        };
        Self { interpreter }
    }

    /// Interpreter command line for `source`: its `#!` line if any,
    /// otherwise the configured default.
    pub fn interpreter_for(&self, source: &str) -> Vec<String> {
        let shebang = source
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("#!"))
            .map(|rest| rest.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|words| !words.is_empty());

        shebang.unwrap_or_else(|| self.interpreter.clone())
    }
}

impl ScriptEngine for ShellScriptEngine {
    fn execute(
        &self,
        script: Script,
        context: ScriptContext,
    ) -> BoxFuture<'_, Result<(), ExecutionError>> {
        let interpreter = self.interpreter_for(&script.source);
        async move {
            let path = script.path.clone();
            run_script(interpreter, script, context)
                .await
                .map_err(|err| ExecutionError::new(path, err))
        }
        .boxed()
    }
}

async fn run_script(interpreter: Vec<String>, script: Script, context: ScriptContext) -> Result<()> {
    let Some((program, args)) = interpreter.split_first() else {
        bail!("no interpreter configured");
    };

    info!(script = %script.path.display(), %program, "running script");

    let dir = context.script_dir().to_path_buf();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env(SCRIPT_ENV, &script.path)
        .env(SCRIPT_DIR_ENV, &dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if !dir.as_os_str().is_empty() {
        cmd.current_dir(&dir);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning interpreter '{program}'"))?;

    // Feed the script text; the interpreter may exit before reading it all.
    let stdin = child.stdin.take();
    let source = script.source;
    let writer = tokio::spawn(async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(source.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let stderr = child.stderr.take();
    let stderr_path = script.path.clone();
    let stderr_task = tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL);
        if let Some(stderr) = stderr {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            while let Ok(Some(line)) = read_line_lossy(&mut reader, &mut buf).await {
                debug!(script = %stderr_path.display(), "stderr: {}", line);
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        tail
    });

    let mut directive_error: Option<anyhow::Error> = None;
    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = read_line_lossy(&mut reader, &mut buf)
            .await
            .context("reading script stdout")?
        {
            match parse_directive(&line) {
                Some(Ok(directive)) => {
                    if let Err(err) = apply_directive(&context, directive).await {
                        warn!(script = %script.path.display(), error = %err, "script output failed");
                        directive_error.get_or_insert(err);
                    }
                }
                Some(Err(err)) => {
                    warn!(script = %script.path.display(), error = %err, "malformed directive");
                    directive_error.get_or_insert(err);
                }
                None => debug!(script = %script.path.display(), "stdout: {}", line),
            }
        }
    }

    let status = child.wait().await.context("waiting for interpreter")?;

    match writer.await {
        Ok(Err(err)) => debug!(script = %script.path.display(), error = %err, "interpreter closed stdin early"),
        Err(err) => debug!(script = %script.path.display(), error = %err, "stdin writer task failed"),
        Ok(Ok(())) => {}
    }
    let tail = stderr_task.await.unwrap_or_default();

    if !status.success() {
        let mut message = format!("script exited with {status}");
        if !tail.is_empty() {
            message.push_str(": ");
            message.push_str(&tail.into_iter().collect::<Vec<_>>().join("\n"));
        }
        return Err(anyhow!(message));
    }

    if let Some(err) = directive_error {
        return Err(err);
    }

    info!(script = %script.path.display(), "script finished");
    Ok(())
}

/// Next line without its terminator; bytes that are not UTF-8 are replaced.
async fn read_line_lossy<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

async fn apply_directive(context: &ScriptContext, directive: Directive) -> Result<()> {
    match directive {
        Directive::Output { file, content } => context.output(&file, content).await,
    }
}

/// Parse `::<name> file=<path>::<payload>`.
///
/// Returns `None` for lines that are not directives of a known name.
pub fn parse_directive(line: &str) -> Option<Result<Directive>> {
    let rest = line.strip_prefix("::")?;
    let (head, payload) = rest.split_once("::")?;
    let (name, params) = head.split_once(' ').unwrap_or((head, ""));

    let json = match name {
        "output" => false,
        "output-json" => true,
        _ => return None,
    };

    Some(parse_output(params, payload, json))
}

fn parse_output(params: &str, payload: &str, json: bool) -> Result<Directive> {
    let file = params
        .split(',')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| *key == "file")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("output directive without file="))?;

    let content = if json {
        let value: Value = serde_json::from_str(payload)
            .with_context(|| format!("invalid JSON for output to {file}"))?;
        OutputContent::Json(value)
    } else {
        OutputContent::Text(unescape(payload))
    };

    Ok(Directive::Output { file, content })
}

/// Undo `%0A` / `%0D` / `%25` escaping of directive payloads.
pub fn unescape(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    let mut rest = payload;

    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let escape = rest.get(idx..idx + 3);
        match escape {
            Some("%0A") | Some("%0a") => out.push('\n'),
            Some("%0D") | Some("%0d") => out.push('\r'),
            Some("%25") => out.push('%'),
            _ => {
                out.push('%');
                rest = &rest[idx + 1..];
                continue;
            }
        }
        rest = &rest[idx + 3..];
    }
    out.push_str(rest);
    out
}
