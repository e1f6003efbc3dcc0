//! Error types for netcfgbu.
//!
//! This module defines the error types used throughout netcfgbu, providing
//! rich error information for debugging and the CLI's user-facing messages.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for netcfgbu operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A phase of the connector state machine that can time out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Prompt,
    PreCapture,
    Capture,
    /// The run's overall deadline elapsed while this host was still
    /// in flight (or had not yet been scheduled).
    Overall,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Connect => "connect",
            Phase::Prompt => "prompt",
            Phase::PreCapture => "pre-capture",
            Phase::Capture => "capture",
            Phase::Overall => "overall run deadline",
        };
        write!(f, "{s}")
    }
}

/// The main error type for netcfgbu.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration errors (fatal at startup; no tasks are launched)
    // ========================================================================
    /// Malformed configuration file, missing environment variable, unknown
    /// filter field, bad regex, invalid URL, and the like.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required environment variable referenced by `$VAR`/`${VAR}` is
    /// missing or empty.
    #[error("environment variable '{0}' is not set or empty")]
    MissingEnvVar(String),

    /// Failed to read or parse the TOML configuration file.
    #[error("failed to load configuration from '{path}': {message}")]
    ConfigLoad {
        path: PathBuf,
        message: String,
    },

    // ========================================================================
    // Inventory errors (fatal before fan-out)
    // ========================================================================
    /// Missing, empty, or unreadable inventory.
    #[error("inventory error: {0}")]
    Inventory(String),

    /// The inventory (or the result after filtering) contains no records.
    #[error("inventory is empty after applying filters")]
    EmptyInventory,

    // ========================================================================
    // Per-host errors (captured and reported, never fatal to the run)
    // ========================================================================
    /// Every credential in the resolved list was rejected.
    #[error("permission denied: attempted {attempted} credential(s)")]
    AuthFailed { attempted: usize },

    /// A connector phase exceeded its deadline.
    #[error("timed out waiting for {phase}")]
    Timeout { phase: Phase },

    /// A socket- or OS-level I/O failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The jump-host required for this record could not be dialed.
    #[error("jump-host unavailable: {0}")]
    JumpHost(String),

    /// Unexpected prompt pattern, truncated output, or otherwise malformed
    /// device response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// SSH-level failure that is neither a timeout nor an auth rejection.
    #[error("ssh error: {0}")]
    Ssh(String),

    // ========================================================================
    // Other
    // ========================================================================
    /// Generic error with an optional source, used by [`ErrorContext`].
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn inventory(message: impl Into<String>) -> Self {
        Self::Inventory(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn jump_host(message: impl Into<String>) -> Self {
        Self::JumpHost(message.into())
    }

    /// True for errors that are per-host and must not abort the whole run.
    pub fn is_per_host(&self) -> bool {
        matches!(
            self,
            Error::AuthFailed { .. }
                | Error::Timeout { .. }
                | Error::Transport(_)
                | Error::JumpHost(_)
                | Error::Protocol(_)
                | Error::Ssh(_)
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::MissingEnvVar(_) | Error::ConfigLoad { .. } => 2,
            Error::Inventory(_) | Error::EmptyInventory => 3,
            _ => 1,
        }
    }

    /// The short "reason" string used in the failures.csv report, matching
    /// the distinction made between timeouts, symbolic OS errors, and the
    /// generic `<Kind>: <message>` fallback.
    pub fn report_reason(&self) -> String {
        match self {
            Error::Timeout { phase } => format!("TIMEOUT({phase})"),
            Error::Transport(io_err) => {
                if let Some(code) = io_err.raw_os_error() {
                    format!("{:?}", io_err.kind())
                        .to_uppercase()
                        .replace(' ', "")
                        + &format!("(errno {code})")
                } else {
                    format!("{:?}: {io_err}", io_err.kind())
                }
            }
            other => format!("{other}"),
        }
    }
}

/// Extension trait for adding context to foreign errors.
pub trait ErrorContext<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_reason_names_the_phase() {
        let err = Error::Timeout { phase: Phase::PreCapture };
        assert_eq!(err.report_reason(), "TIMEOUT(pre-capture)");
    }

    #[test]
    fn config_errors_exit_nonzero() {
        assert_eq!(Error::config("bad").exit_code(), 2);
    }
}
