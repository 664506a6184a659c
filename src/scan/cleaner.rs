//! OCR text cleanup.
//!
//! Recognition output is littered with stray pipes, slashes, and underscores
//! where the engine misreads cell borders and ruled lines. We strip those and
//! collapse horizontal whitespace, but we never touch newlines: the
//! field-extraction heuristics downstream lean on line structure, so the line
//! count in must equal the line count out.

use std::sync::LazyLock;

use regex::Regex;

/// Characters the engine hallucinates from table borders and fold lines.
static STRAY_SYMBOLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[|\\/_]+").expect("stray-symbol pattern should compile"));

/// Runs of spaces and tabs. Deliberately excludes `\n`.
static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("horizontal-space pattern should compile"));

/// Normalize raw recognition output ahead of field extraction.
///
/// Removes every `|`, `\`, `/`, and `_`, collapses runs of spaces/tabs into a
/// single space, and trims spaces, tabs, and carriage returns from both ends.
/// Newlines are preserved so the output has exactly as many lines as the
/// input. Total and idempotent over all strings.
pub fn clean_text(text: &str) -> String {
    let stripped = STRAY_SYMBOLS.replace_all(text, "");
    let collapsed = HORIZONTAL_SPACE.replace_all(&stripped, " ");
    collapsed.trim_matches([' ', '\t', '\r']).to_string()
}
