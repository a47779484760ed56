//! Turns raw model output into a commit message a person can use.
//!
//! Every function here is pure and never fails: malformed input degrades to
//! the input itself or to an empty string, and the caller decides what an
//! empty result means.

use regex::Regex;
use std::sync::LazyLock;

static COMMIT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\[COMMIT\](.*?)\[/COMMIT\]").expect("literal regex"));

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think\s*>.*?</think\s*>").expect("literal regex"));

static THINKING_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<thinking\s*>.*?</thinking\s*>").expect("literal regex"));

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("literal regex"));

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("literal regex"));

static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("literal regex"));

static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("literal regex"));

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*(?:\n[ \t]*){3,}").expect("literal regex"));

static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("literal regex"));

static LINE_EDGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]+|[ \t]+$").expect("literal regex"));

/// Return the trimmed text between the first `[COMMIT]` and the nearest
/// `[/COMMIT]`, or the whole input when no marker pair is present.
pub fn extract_payload(raw: &str) -> &str {
    match COMMIT_BLOCK.captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw,
    }
}

/// Drop `<think>` and `<thinking>` blocks along with everything inside them.
pub fn remove_thinking_tags(text: &str) -> String {
    let text = THINK_BLOCK.replace_all(text, "");
    THINKING_BLOCK.replace_all(&text, "").into_owned()
}

/// Remove fenced code blocks and unwrap bold, italic, and inline-code spans.
pub fn strip_markdown(text: &str) -> String {
    let text = CODE_FENCE.replace_all(text, "");
    // `**` has to go before `*`, otherwise the italic pass leaves stray markers.
    let text = BOLD.replace_all(&text, "${1}");
    let text = ITALIC.replace_all(&text, "${1}");
    INLINE_CODE.replace_all(&text, "${1}").into_owned()
}

/// Collapse blank-line runs and repeated spaces, strip line edges, and trim.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    let text = SPACE_RUN.replace_all(&text, " ");
    let text = LINE_EDGES.replace_all(&text, "");
    text.trim().to_string()
}

/// Run every cleanup stage except delimiter extraction.
pub fn clean_message(text: &str) -> String {
    let cleaned = remove_thinking_tags(text);
    let cleaned = strip_markdown(&cleaned);
    normalize_whitespace(&cleaned)
}

fn clean_pass(raw: &str) -> String {
    clean_message(extract_payload(raw))
}

/// Extract the `[COMMIT]` payload from raw model output and clean it.
///
/// An empty return value means the model produced nothing usable. The pass is
/// repeated until the text stops changing; each pass either leaves the text
/// alone or makes it strictly shorter, so the loop terminates and cleaning an
/// already-clean message is a no-op.
pub fn extract_and_clean(raw: &str) -> String {
    let mut current = clean_pass(raw);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
