// src/patterns/expand.rs

//! `${kind:payload}` placeholder substitution in glob patterns.

use std::sync::{Arc, LazyLock};

use futures::future::try_join_all;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::ExpansionError;
use crate::host::Host;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^:}]+):([^}]+)\}").expect("placeholder regex is valid")
});

/// One piece of a tokenized pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied through unchanged, including placeholders of unknown kind.
    Literal(&'a str),
    /// `${env:NAME}`.
    Env(&'a str),
    /// `${command:ID}`.
    Command(&'a str),
}

/// Split `pattern` into literal text and placeholders, left to right.
///
/// Empty literal runs are not emitted, so an empty pattern yields no
/// segments at all.
pub fn tokenize(pattern: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(pattern) {
        let Some(token) = caps.get(0) else { continue };
        if token.start() > last {
            segments.push(Segment::Literal(&pattern[last..token.start()]));
        }

        let kind = caps.get(1).map_or("", |m| m.as_str());
        let payload = caps.get(2).map_or("", |m| m.as_str());
        segments.push(match kind {
            "env" => Segment::Env(payload),
            "command" => Segment::Command(payload),
            _ => Segment::Literal(token.as_str()),
        });

        last = token.end();
    }

    if last < pattern.len() {
        segments.push(Segment::Literal(&pattern[last..]));
    }

    segments
}

/// Text substituted for a command result: strings verbatim, any other JSON
/// value as compact JSON.
pub fn command_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rewrites patterns by resolving their placeholders through the [`Host`].
#[derive(Clone)]
pub struct VariableExpander {
    host: Arc<dyn Host>,
}

impl std::fmt::Debug for VariableExpander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableExpander").finish_non_exhaustive()
    }
}

impl VariableExpander {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }

    /// Substitute every placeholder of `pattern`.
    ///
    /// All lookups run concurrently; the result is assembled by position in
    /// `pattern`, independent of the order in which lookups complete.
    pub async fn expand(&self, pattern: &str) -> Result<String, ExpansionError> {
        let segments = tokenize(pattern);
        let parts = try_join_all(
            segments
                .into_iter()
                .map(|segment| self.substitute(pattern, segment)),
        )
        .await?;

        let expanded = parts.concat();
        if expanded != pattern {
            debug!(%pattern, %expanded, "expanded pattern");
        }
        Ok(expanded)
    }

    async fn substitute(&self, pattern: &str, segment: Segment<'_>) -> Result<String, ExpansionError> {
        match segment {
            Segment::Literal(text) => Ok(text.to_string()),
            Segment::Env(name) => Ok(self.host.env_var(name).unwrap_or_default()),
            Segment::Command(id) => {
                let value = self
                    .host
                    .execute_command(id)
                    .await
                    .map_err(|source| ExpansionError {
                        pattern: pattern.to_string(),
                        command: id.to_string(),
                        source: source.into(),
                    })?;
                Ok(command_value_to_string(&value))
            }
        }
    }
}
