//! Writes captured configuration text to the configs directory, grounded on
//! `netcfgbu/connectors/basic.py`'s `save_config`.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Persists `content` to `<configs_dir>/<name>.cfg`, creating the directory
/// if absent. `content` is expected to already be linted and `\r`-stripped;
/// a trailing newline is appended unconditionally, even if `content` already
/// ends with one. Writes are open-truncate-write-close; versioning is the
/// Git post-processor's job, not this module's.
pub fn save_config(configs_dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(configs_dir)?;
    let path = configs_dir.join(format!("{name}.cfg"));
    let mut body = content.to_string();
    body.push('\n');
    std::fs::write(&path, body)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_file_with_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_config(dir.path(), "sw1", "hostname sw1\n!").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "hostname sw1\n!\n");
    }

    #[test]
    fn newline_is_appended_even_when_content_already_ends_with_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_config(dir.path(), "sw1", "hostname sw1\n!\n").unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "hostname sw1\n!\n\n");
    }

    #[test]
    fn creates_configs_dir_if_absent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("configs");
        save_config(&nested, "sw1", "x").unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn overwrites_on_subsequent_capture() {
        let dir = tempfile::tempdir().unwrap();
        save_config(dir.path(), "sw1", "first").unwrap();
        let path = save_config(dir.path(), "sw1", "second").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "second\n");
    }
}
