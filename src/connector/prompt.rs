//! Device prompt detection, grounded on `netcfgbu/connectors/basic.py`'s
//! use of `consts.PROMPT_VALID_CHARS` / `PROMPT_MAX_CHARS`.
//!
//! A prompt is a terminal line of the form `<name><ws>*<sigil>` where `name`
//! is drawn from alphanumerics plus a small punctuation set and `sigil` is
//! one of `#`, `>`, `$`. Matching is anchored to the *last* line of output.

use crate::consts::PROMPT_VALID_CHARS;
use crate::error::{Error, Result};
use regex::Regex;

/// Compiles the prompt regex for an OS policy, using `extra_chars` (the
/// policy's `prompt_chars` override) in place of the default character set
/// when given.
pub fn compile(extra_chars: Option<&str>) -> Result<Regex> {
    let chars = extra_chars.unwrap_or(PROMPT_VALID_CHARS);
    let escaped: String = chars.chars().map(|c| regex::escape(&c.to_string())).collect();
    let pattern = format!(r"^[A-Za-z0-9{escaped}]+[ \t]*[#>$]$");
    Regex::new(&pattern).map_err(|e| Error::config(format!("invalid prompt pattern: {e}")))
}

/// True if the last (non-empty, trailing-newline-stripped) line of `text`
/// matches the prompt regex.
pub fn is_at_prompt(regex: &Regex, text: &str) -> bool {
    last_line(text).map(|line| regex.is_match(line)).unwrap_or(false)
}

fn last_line(text: &str) -> Option<&str> {
    let trimmed = text.trim_end_matches('\n');
    trimmed.rsplit('\n').next().filter(|l| !l.is_empty())
}
