//! # netcfgbu - Concurrent Network Device Configuration Backup
//!
//! netcfgbu logs into a fleet of network devices over SSH, captures their
//! running configuration, lints it, and persists it to disk (optionally
//! committing the result to a Git repository). It is designed around one
//! idea: device interaction is the slow, failure-prone part, so every host
//! is handled independently and concurrently, with per-host failures never
//! aborting the run.
//!
//! ## Core Concepts
//!
//! - **Inventory**: a flat CSV table of hosts (C1), each with an `os_name`
//!   that selects a connector policy.
//! - **Connector**: the per-host state machine (C4) that logs in, captures
//!   the running configuration, and returns it as text.
//! - **Jump hosts**: optional single-level SSH bastions (C3) that some
//!   hosts must be reached through.
//! - **Linter**: post-capture text trimming (banners, trailing markers).
//! - **Scheduler**: bounded, fan-out execution across the whole inventory
//!   (C7), folding every outcome into a [`report::Report`].
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                              │
//! │                    (clap-based command parsing)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           Scheduler (C7)                             │
//! │           bounded fan-out over the inventory, one Report             │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │    Inventory    │   │      Connector       │   │   Jump-host         │
//! │  (CSV + filter) │   │  (login + capture)   │   │   tunneling          │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!          │                         │                         │
//!          └─────────────────────────┼─────────────────────────┘
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Target Devices                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of the most commonly needed types.

    pub use crate::config::{Config, ConnectorKind, Credential};
    pub use crate::connector::Connector;
    pub use crate::error::{Error, Result};
    pub use crate::inventory::{Inventory, Record};
    pub use crate::report::Report;
    pub use crate::scheduler::{build_runtime, run_for_each};
}

/// Error types and the [`error::Result`] alias used throughout the crate.
pub mod error;

/// Shared constants: default timeouts, ports, filenames, and environment
/// variable names.
pub mod consts;

/// Configuration loading: the TOML document schema, `$VAR` expansion, and
/// cross-reference validation.
pub mod config;

/// Tabular host inventory (CSV) and the include/exclude filter language.
pub mod inventory;

/// Low-level SSH transport and jump-host tunneling. Knows nothing about
/// device prompts or capture semantics.
pub mod connection;

/// The per-host connector state machine: login, optional paging-disable,
/// capture, and the "prompted" banner-login variant.
pub mod connector;

/// Post-capture text trimming (`starts_after` / `ends_at`).
pub mod linter;

/// Writes captured configuration text to the configs directory.
pub mod persist;

/// Fan-out scheduler tying inventory, connector, and report together.
pub mod scheduler;

/// Per-run outcome accounting and the `failures.csv` report.
pub mod report;

/// Bare TCP reachability probing, independent of SSH.
pub mod probe;

/// Git post-processing of the configs directory (`prepare`/`save`/`status`).
pub mod vcs;

/// The `netcfgbu` command-line interface.
pub mod cli;

/// Returns the current version of netcfgbu.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns detailed version information including build metadata.
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        rust_version: option_env!("CARGO_PKG_RUST_VERSION").unwrap_or("unknown"),
        target: std::env::consts::ARCH,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Detailed version information for the netcfgbu build.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Semantic version string
    pub version: &'static str,
    /// Minimum Rust version required
    pub rust_version: &'static str,
    /// Target triple for the build
    pub target: &'static str,
    /// Build profile (debug or release)
    pub profile: &'static str,
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "netcfgbu {} ({}, {})",
            self.version, self.target, self.profile
        )
    }
}
