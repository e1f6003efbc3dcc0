//! Post-capture textual trimming, grounded on `netcfgbu/linter.py`.
//!
//! Linting never parses the device configuration semantically; it only
//! drops a known-uninteresting prefix and/or suffix by pattern.

use crate::config::LinterSpec;
use crate::error::{Error, Result};
use regex::Regex;
use std::path::Path;

/// Trims `content` per `spec`. Idempotent: `lint(lint(x)) == lint(x)`.
pub fn lint(content: &str, spec: &LinterSpec) -> Result<String> {
    let mut trimmed = content;

    if let Some(pattern) = &spec.starts_after {
        let regex = Regex::new(&format!("(?m)^{pattern}.*$"))
            .map_err(|e| Error::config(format!("invalid starts_after pattern: {e}")))?;
        if let Some(m) = regex.find(trimmed) {
            let mut end = m.end();
            if trimmed[end..].starts_with('\n') {
                end += 1;
            }
            trimmed = &trimmed[end..];
        }
    }

    if let Some(literal) = &spec.ends_at {
        let needle = format!("\n{literal}");
        if let Some(pos) = trimmed.rfind(&needle) {
            trimmed = &trimmed[..pos];
        }
    }

    Ok(trimmed.to_string())
}

/// File-level variant: lints the file at `path` in place, renaming the
/// previous contents to `<name>.orig` only when linting actually changed
/// the content.
pub fn lint_file(path: &Path, spec: &LinterSpec) -> Result<()> {
    let original = std::fs::read_to_string(path)?;
    let linted = lint(&original, spec)?;
    if linted != original {
        let orig_path = path.with_extension(format!(
            "{}.orig",
            path.extension().and_then(|e| e.to_str()).unwrap_or("")
        ));
        std::fs::rename(path, &orig_path)?;
        std::fs::write(path, linted)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(starts_after: Option<&str>, ends_at: Option<&str>) -> LinterSpec {
        LinterSpec {
            starts_after: starts_after.map(String::from),
            ends_at: ends_at.map(String::from),
        }
    }

    #[test]
    fn starts_after_drops_banner_lines() {
        let content = "show running-config\nhostname sw1\n!\n";
        let out = lint(content, &spec(Some("show running-config"), None)).unwrap();
        assert_eq!(out, "hostname sw1\n!\n");
    }

    #[test]
    fn ends_at_truncates_at_last_occurrence() {
        let content = "hostname sw1\n!\nend\ntrailing garbage\n";
        let out = lint(content, &spec(None, Some("end"))).unwrap();
        assert_eq!(out, "hostname sw1\n!");
    }

    #[test]
    fn ends_at_leaves_tail_when_not_found() {
        let content = "hostname sw1\n!\n";
        let out = lint(content, &spec(None, Some("end"))).unwrap();
        assert_eq!(out, content);
    }

    #[test]
    fn lint_is_idempotent() {
        let content = "show running-config\nhostname sw1\n!\nend\ntrailing\n";
        let s = spec(Some("show running-config"), Some("end"));
        let once = lint(content, &s).unwrap();
        let twice = lint(&once, &s).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn already_trimmed_content_is_unchanged() {
        let content = "hostname sw1\n!\n";
        let s = spec(Some("show running-config"), None);
        assert_eq!(lint(content, &s).unwrap(), content);
    }
}
