//! Reduces raw interpreter stderr to the script's own error message.

use std::sync::LazyLock;

use regex::Regex;

/// Matches CSI/OSC terminal control sequences (colours, cursor movement, hyperlinks).
const ANSI_PATTERN: &str = r"[\x1b\x{9b}][\[\]()#;?]*(?:(?:(?:[a-zA-Z\d]*(?:;[-a-zA-Z\d/#&.:=?%@~_]*)*)?\x07)|(?:(?:\d{1,4}(?:;\d{0,4})*)?[\dA-PR-TZcf-ntqry=><~]))";

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ANSI_PATTERN).expect("valid regex"));

/// First-line notices the interpreter prints before the script's own output.
const PREAMBLE_PREFIXES: &[&str] = &["Check ", "Compile ", "Download "];

/// Strip ANSI escapes and the interpreter preamble line from `raw`.
pub fn format_error(raw: &str) -> String {
    let stripped = ANSI_RE.replace_all(raw, "");
    let trimmed = stripped.trim();

    let mut lines = trimmed.lines();
    match lines.next() {
        Some(first) if is_preamble(first) => lines.collect::<Vec<_>>().join("\n").trim().to_string(),
        _ => trimmed.to_string(),
    }
}

fn is_preamble(line: &str) -> bool {
    PREAMBLE_PREFIXES.iter().any(|p| line.starts_with(p))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
