//! Shared constants and defaults, mirroring the original implementation's
//! module of the same name.

use std::time::Duration;

/// Default capture command issued when an `os_name` policy doesn't override it.
pub const DEFAULT_GET_CONFIG: &str = "show running-config";

/// Default per-host capture timeout when an OS policy doesn't override it.
pub const DEFAULT_GETCONFIG_TIMEOUT: Duration = Duration::from_secs(60);

/// How long the first read of an interactive session waits for a prompt.
pub const PROMPT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long each pre-capture ("paging disable") command gets to complete.
pub const PRE_CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for each phase of the banner-style `User:`/`Password:` dance.
pub const PROMPTED_LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default global bound on simultaneous SSH authentication attempts.
pub const DEFAULT_MAX_STARTUPS: usize = 100;

/// Default port for SSH and the TCP probe.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default timeout for the `probe` operation when `-t/--timeout` is 0.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Characters (besides alphanumerics) a prompt "name" may contain.
pub const PROMPT_VALID_CHARS: &str = ".-_@()/:~";

/// Sigils that terminate a recognized device prompt.
pub const PROMPT_SIGILS: &[char] = &['#', '>', '$'];

/// Terminal type requested when a pty is needed.
pub const PTY_TERM_TYPE: &str = "vt100";

/// Default config file name, overridable via `NETCFGBU_CONFIG`.
pub const DEFAULT_CONFIG_FILENAME: &str = "netcfgbu.toml";

pub const ENV_CONFIG: &str = "NETCFGBU_CONFIG";
pub const ENV_INVENTORY: &str = "NETCFGBU_INVENTORY";
pub const ENV_CONFIGSDIR: &str = "NETCFGBU_CONFIGSDIR";
pub const ENV_DEFAULT_USERNAME: &str = "NETCFGBU_DEFAULT_USERNAME";
pub const ENV_DEFAULT_PASSWORD: &str = "NETCFGBU_DEFAULT_PASSWORD";

/// Name of the CSV report written whenever any task fails.
pub const FAILURES_REPORT_FILENAME: &str = "failures.csv";
