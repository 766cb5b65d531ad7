// src/exec/function_code.rs

//! Extraction of a callable's body from its source text.

use std::sync::LazyLock;

use regex::Regex;

/// Head of an expression-bodied arrow lambda, e.g. `(a, b) => `.
static ARROW_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+?=>[ \t]*").expect("arrow regex is valid"));

/// Head of an expression-bodied closure, e.g. `move |a| `.
static CLOSURE_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:move\s*)?\|[^|]*\|\s*").expect("closure regex is valid"));

/// Everything up to the `{` that opens a block body: a closure head, or a
/// parameter list followed by an optional `-> Ret` and an optional `=>`.
/// Only the first line is searched for the closing `)`, so destructured
/// parameters such as `({ a, b }) => {` are handled.
static BLOCK_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:move\s*)?\|[^|]*\|\s*(?:->[^{]*)?|.*?\)\s*(?:->[^{]*)?(?:=>\s*)?)\{",
    )
    .expect("block regex is valid")
});

/// Return the de-indented body of the callable whose source is `source`.
///
/// ```
/// use autoscripts::exec::function_code;
///
/// let src = "function build() {\n    const a = 1;\n    return a;\n}";
/// assert_eq!(function_code(src), "const a = 1;\nreturn a;\n");
/// assert_eq!(function_code("(x) => x * 2"), "x * 2");
/// ```
pub fn function_code(source: &str) -> String {
    let source = source.trim();

    let Some(without_brace) = source.strip_suffix('}') else {
        // Expression lambda: the body is whatever follows the head.
        if let Some(head) = ARROW_HEAD.find(source) {
            return source[head.end()..].to_string();
        }
        if let Some(head) = CLOSURE_HEAD.find(source) {
            return source[head.end()..].to_string();
        }
        return source.to_string();
    };

    let body = match BLOCK_HEAD.find(without_brace) {
        Some(head) => &without_brace[head.end()..],
        None => without_brace,
    };
    let body = body
        .strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body);

    dedent(body)
}

/// Remove the indentation shared by every non-blank line.
///
/// Blank lines lose at most that much leading whitespace.
pub fn dedent(text: &str) -> String {
    let indent_of = |line: &str| {
        line.bytes()
            .take_while(|b| *b == b' ' || *b == b'\t')
            .count()
    };

    let min_indent = text
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(indent_of)
        .min()
        .unwrap_or(0);

    if min_indent == 0 {
        return text.to_string();
    }

    text.split('\n')
        .map(|line| &line[indent_of(line).min(min_indent)..])
        .collect::<Vec<_>>()
        .join("\n")
}
