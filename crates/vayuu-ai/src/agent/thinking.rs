//! Removal of `<think>...</think>` reasoning blocks from model output.

use once_cell::sync::Lazy;
use regex::Regex;

static PAIRED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid paired think regex"));
static ORPHAN_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^.*</think>\s*").expect("valid orphan end regex"));
static ORPHAN_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*$").expect("valid orphan start regex"));
static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid blank-run regex"));

/// Strip reasoning delimiters and everything they enclose.
///
/// Well-formed pairs go first. An orphaned `</think>` drops everything before
/// it and an orphaned `<think>` drops everything after it. Runs of blank
/// lines collapse to a single blank line and the result is trimmed.
pub fn strip_thinking_tags(text: &str) -> String {
    let text = PAIRED_BLOCK.replace_all(text, "");
    let text = ORPHAN_END.replace(&text, "");
    let text = ORPHAN_START.replace(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}
