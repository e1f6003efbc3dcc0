//! Configuration loading for netcfgbu.
//!
//! The configuration document is TOML with sections `defaults`,
//! `credentials`, `os_name.<name>`, `linters.<name>`, `inventory`,
//! `jumphost`, `git`, `ssh_configs`, and `logging`. Any string value may
//! contain `$VAR` or `${VAR}` references, expanded against the process
//! environment at load time; a missing or empty variable is fatal.

use crate::consts::{self, DEFAULT_GET_CONFIG, DEFAULT_GETCONFIG_TIMEOUT};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn duration_secs_default() -> Duration {
    DEFAULT_GETCONFIG_TIMEOUT
}

/// A username/password pair. Deserialized as raw strings; callers must run
/// [`expand_env`] on each field before using the credential.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    fn expand(self) -> Result<Self> {
        Ok(Self {
            username: expand_env(&self.username)?,
            password: expand_env(&self.password)?,
        })
    }
}

/// `[defaults]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub inventory: Option<PathBuf>,
    pub configs_dir: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(with = "humantime_secs", default = "duration_secs_default")]
    pub timeout: Duration,
    pub max_startups: Option<usize>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            inventory: None,
            configs_dir: None,
            username: None,
            password: None,
            timeout: DEFAULT_GETCONFIG_TIMEOUT,
            max_startups: None,
        }
    }
}

/// The connector kind selectable per `os_name`, a tagged variant rather than
/// a plugin/class hierarchy (see the design notes on dynamic dispatch).
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    #[default]
    Default,
    Prompted,
}

/// `[os_name.<name>]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsPolicy {
    pub credentials: Vec<Credential>,
    pub pre_get_config: Vec<String>,
    pub get_config: String,
    pub connector: ConnectorKind,
    pub linter: Option<String>,
    #[serde(with = "humantime_secs", default = "duration_secs_default")]
    pub timeout: Duration,
    pub ssh_configs: HashMap<String, String>,
    pub prompt_chars: Option<String>,
}

impl Default for OsPolicy {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            pre_get_config: Vec::new(),
            get_config: DEFAULT_GET_CONFIG.to_string(),
            connector: ConnectorKind::default(),
            linter: None,
            timeout: DEFAULT_GETCONFIG_TIMEOUT,
            ssh_configs: HashMap::new(),
            prompt_chars: None,
        }
    }
}

/// `[linters.<name>]`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LinterSpec {
    pub starts_after: Option<String>,
    pub ends_at: Option<String>,
}

/// `[inventory]` — the external inventory-build script, consumed by
/// `inventory build` (out of the core's scope; the core only reads the
/// resulting CSV).
#[derive(Debug, Clone, Deserialize)]
pub struct InventorySpec {
    pub script: PathBuf,
}

/// One `[[jumphost]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct JumpHostSpec {
    pub name: String,
    pub proxy: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(with = "humantime_secs", default = "duration_secs_default")]
    pub timeout: Duration,
}

/// `[git]`, consumed only by the Git post-processor, never by the core.
#[derive(Debug, Clone, Deserialize)]
pub struct GitSpec {
    pub repo_url: String,
    pub user: String,
    pub email: String,
    pub token: Option<String>,
    pub deploy_key: Option<PathBuf>,
    pub deploy_key_passphrase: Option<String>,
}

/// `[logging]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// The top-level, validated configuration document consumed by the core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: Defaults,
    pub credentials: Vec<Credential>,
    pub os_name: HashMap<String, OsPolicy>,
    pub linters: HashMap<String, LinterSpec>,
    pub inventory: Option<InventorySpec>,
    #[serde(rename = "jumphost")]
    pub jumphosts: Vec<JumpHostSpec>,
    pub git: Option<GitSpec>,
    pub ssh_configs: HashMap<String, String>,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            credentials: Vec::new(),
            os_name: HashMap::new(),
            linters: HashMap::new(),
            inventory: None,
            jumphosts: Vec::new(),
            git: None,
            ssh_configs: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads, expands, and validates the configuration file. `path`
    /// defaults to `NETCFGBU_CONFIG`, then `./netcfgbu.toml`; absence of the
    /// file is tolerated as long as the required defaults are resolvable
    /// from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = resolve_config_path(path);

        let mut config = match resolved {
            Some(ref path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                toml::from_str::<Config>(&raw).map_err(|e| Error::ConfigLoad {
                    path: path.clone(),
                    message: e.to_string(),
                })?
            }
            None => Config::default(),
        };

        config.apply_env_fallbacks();
        config.expand_env_refs()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_fallbacks(&mut self) {
        if self.defaults.inventory.is_none() {
            self.defaults.inventory = std::env::var(consts::ENV_INVENTORY).ok().map(PathBuf::from);
        }
        if self.defaults.configs_dir.is_none() {
            self.defaults.configs_dir = std::env::var(consts::ENV_CONFIGSDIR)
                .ok()
                .map(PathBuf::from)
                .or_else(|| std::env::current_dir().ok());
        }
        if self.defaults.username.is_none() {
            self.defaults.username = std::env::var(consts::ENV_DEFAULT_USERNAME).ok();
        }
        if self.defaults.password.is_none() {
            self.defaults.password = std::env::var(consts::ENV_DEFAULT_PASSWORD).ok();
        }
    }

    fn expand_env_refs(&mut self) -> Result<()> {
        for cred in std::mem::take(&mut self.credentials) {
            self.credentials.push(cred.expand()?);
        }
        if let Some(username) = self.defaults.username.take() {
            self.defaults.username = Some(expand_env(&username)?);
        }
        if let Some(password) = self.defaults.password.take() {
            self.defaults.password = Some(expand_env(&password)?);
        }
        for policy in self.os_name.values_mut() {
            let creds = std::mem::take(&mut policy.credentials);
            for cred in creds {
                policy.credentials.push(cred.expand()?);
            }
        }
        for jh in &mut self.jumphosts {
            jh.proxy = expand_env(&jh.proxy)?;
        }
        if let Some(git) = &mut self.git {
            git.repo_url = expand_env(&git.repo_url)?;
            if let Some(token) = git.token.take() {
                git.token = Some(expand_env(&token)?);
            }
        }
        Ok(())
    }

    /// Cross-reference validation: every OS policy's linter name must exist
    /// in the linters table.
    fn validate(&self) -> Result<()> {
        for (os, policy) in &self.os_name {
            if let Some(linter) = &policy.linter {
                if !self.linters.contains_key(linter) {
                    return Err(Error::config(format!(
                        "os_name '{os}' references unknown linter '{linter}'"
                    )));
                }
            }
        }
        if let Some(spec) = &self.inventory {
            if !spec.script.exists() {
                return Err(Error::config(format!(
                    "inventory build script '{}' does not exist",
                    spec.script.display()
                )));
            }
        }
        Ok(())
    }

    pub fn default_credential(&self) -> Option<Credential> {
        match (&self.defaults.username, &self.defaults.password) {
            (Some(u), Some(p)) => Some(Credential {
                username: u.clone(),
                password: p.clone(),
            }),
            _ => None,
        }
    }

    pub fn os_policy(&self, os_name: &str) -> OsPolicy {
        self.os_name.get(os_name).cloned().unwrap_or_default()
    }

    pub fn max_startups(&self) -> usize {
        self.defaults
            .max_startups
            .unwrap_or(consts::DEFAULT_MAX_STARTUPS)
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(consts::ENV_CONFIG) {
        return Some(PathBuf::from(p));
    }
    let default = PathBuf::from(consts::DEFAULT_CONFIG_FILENAME);
    if default.exists() {
        Some(default)
    } else {
        None
    }
}

static ENV_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(?P<braced>[A-Za-z_][A-Za-z0-9_]*)\}|\$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Expands `$VAR` and `${VAR}` references against the process environment.
/// A missing or empty variable is a fatal [`Error::MissingEnvVar`], matching
/// the original's `EnvExpand` validator.
pub fn expand_env(value: &str) -> Result<String> {
    let mut err = None;
    let expanded = ENV_VAR_RE.replace_all(value, |caps: &regex::Captures| {
        let name = caps
            .name("braced")
            .or_else(|| caps.name("bare"))
            .unwrap()
            .as_str();
        match std::env::var(name) {
            Ok(v) if !v.is_empty() => v,
            _ => {
                err.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    if let Some(name) = err {
        return Err(Error::MissingEnvVar(name));
    }
    Ok(expanded.into_owned())
}

/// `serde(with = ...)` helper that (de)serializes a plain integer number of
/// seconds as a [`Duration`], matching the TOML schema's plain-int timeouts.
mod humantime_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn expands_braced_and_bare_vars() {
        unsafe { std::env::set_var("NETCFGBU_TEST_VAR", "secret") };
        assert_eq!(expand_env("$NETCFGBU_TEST_VAR").unwrap(), "secret");
        assert_eq!(expand_env("${NETCFGBU_TEST_VAR}").unwrap(), "secret");
        unsafe { std::env::remove_var("NETCFGBU_TEST_VAR") };
    }

    #[test]
    #[serial]
    fn missing_var_is_fatal() {
        unsafe { std::env::remove_var("NETCFGBU_DOES_NOT_EXIST") };
        assert!(expand_env("$NETCFGBU_DOES_NOT_EXIST").is_err());
    }

    #[test]
    fn validate_rejects_unknown_linter_reference() {
        let mut config = Config::default();
        config.os_name.insert(
            "eos".to_string(),
            OsPolicy {
                linter: Some("missing".to_string()),
                ..Default::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_minimal_toml_document() {
        let toml = r#"
            [defaults]
            timeout = 30

            [os_name.eos]
            get_config = "show running-config"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.defaults.timeout, Duration::from_secs(30));
        assert_eq!(config.os_name["eos"].get_config, "show running-config");
    }
}
