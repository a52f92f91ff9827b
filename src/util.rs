use std::sync::LazyLock;

use regex::Regex;

/// Insert a space before every capital letter that follows a non-space character.
///
/// `ConnectionError` → `Connection Error`, `gTTSError` → `g T T S Error`.
pub fn split_caps(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if c.is_ascii_uppercase() && prev.is_some_and(|p| !p.is_whitespace()) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

#[allow(clippy::unwrap_used)] // literal patterns
static NON_ASCII_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\x00-\x7f]+").unwrap());
#[allow(clippy::unwrap_used)]
static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n|\n|\t").unwrap());

/// Clean up text returned by web services so it can be spoken.
///
/// Runs of non-ASCII characters (usually mangled apostrophes) become `'`,
/// line breaks and tabs become spaces.
pub fn repair_response(s: &str) -> String {
    let apostrophes = NON_ASCII_RUN.replace_all(s, "'");
    LINE_BREAKS.replace_all(&apostrophes, " ").into_owned()
}
