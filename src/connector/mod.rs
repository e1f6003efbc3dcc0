//! The connector state machine (C4) — the design centerpiece. Owns the
//! per-host login, optional paging-disable, capture, and close sequence.
//! Grounded on `netcfgbu/connectors/basic.py`.

pub mod prompt;

use crate::config::{Config, ConnectorKind, Credential, OsPolicy};
use crate::connection::jump_host::JumpHostManager;
use crate::connection::russh::SshClient;
use crate::consts::{
    PRE_CAPTURE_TIMEOUT, PROMPTED_LOGIN_TIMEOUT, PROMPT_WAIT_TIMEOUT, PTY_TERM_TYPE,
};
use crate::error::{Error, Phase, Result};
use crate::inventory::Record;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Resolves the ordered credential list for a host (C2), grounded on
/// `netcfgbu/connectors/basic.py`'s `get_config_credentials`:
/// (a) the record's own `username`/`password` if both present,
/// (b) each credential listed under the host's OS policy,
/// (c) the default credential,
/// (d) each global credential.
pub fn resolve_credentials(record: &Record, os_policy: &OsPolicy, config: &Config) -> Vec<Credential> {
    let mut out = Vec::new();

    if let (Some(u), Some(p)) = (record.username(), record.password()) {
        out.push(Credential {
            username: u.to_string(),
            password: p.to_string(),
        });
    }

    out.extend(os_policy.credentials.iter().cloned());

    if let Some(default) = config.default_credential() {
        out.push(default);
    }

    out.extend(config.credentials.iter().cloned());

    out
}

/// Whether this record's OS policy calls for Exec mode (no pre-capture
/// commands) or Interactive mode (pre-capture present).
fn capture_mode(policy: &OsPolicy) -> CaptureMode {
    if policy.pre_get_config.is_empty() {
        CaptureMode::Exec
    } else {
        CaptureMode::Interactive
    }
}

enum CaptureMode {
    Exec,
    Interactive,
}

/// Shared, read-only state every connector task needs: the max-startups
/// semaphore and the jump-host registry. Lifted out of process-global
/// statics per the design notes — one `Runtime` is built once per run and
/// handed to every task.
pub struct Runtime {
    pub semaphore: Arc<Semaphore>,
    pub jump_hosts: Arc<JumpHostManager>,
}

/// The per-host object executing the capture protocol. Created per record,
/// discarded after one run.
pub struct Connector {
    record: Record,
    policy: OsPolicy,
    credentials: Vec<Credential>,
    prompt_re: Regex,
    name: String,
}

impl Connector {
    /// Builds a connector for `record`. An empty resolved credential list is
    /// a fatal per-host [`Error::Config`], raised here (at construction),
    /// not at first login attempt.
    pub fn new(record: Record, config: &Config) -> Result<Self> {
        let os_name = record.os_name().unwrap_or_default();
        let policy = config.os_policy(os_name);
        let credentials = resolve_credentials(&record, &policy, config);
        if credentials.is_empty() {
            return Err(Error::config(format!(
                "no credentials available for host '{}'",
                record.display_name().unwrap_or("<unknown>")
            )));
        }
        let prompt_re = prompt::compile(policy.prompt_chars.as_deref())?;
        let name = record.display_name()?.to_string();
        Ok(Self {
            record,
            policy,
            credentials,
            prompt_re,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn os_name(&self) -> &str {
        self.record.os_name().unwrap_or_default()
    }

    fn host(&self) -> Result<&str> {
        self.record
            .host()
            .or_else(|| self.record.ipaddr())
            .ok_or_else(|| Error::inventory("record has neither 'host' nor 'ipaddr'"))
    }

    /// Login protocol (C4 §4.4). Tries each credential in order under the
    /// max-startups semaphore, held only for the connect+authenticate step.
    /// Returns the connected (and, if required, pty-opened) client plus the
    /// username that succeeded.
    async fn login(&self, runtime: &Runtime) -> Result<(SshClient, String)> {
        let host = self.host()?;
        let port = crate::consts::DEFAULT_SSH_PORT;
        let tunnel_name = runtime.jump_hosts.route_for(&self.record).map(str::to_string);

        for credential in &self.credentials {
            let permit = runtime
                .semaphore
                .acquire()
                .await
                .map_err(|_| Error::protocol("max-startups semaphore closed"))?;

            let connect_result = self.connect_and_authenticate(host, port, credential, runtime, tunnel_name.as_deref()).await;

            // Released immediately after success/failure, never held across
            // capture — the fix for the original's over-broad hold.
            drop(permit);

            match connect_result {
                Ok(Some(client)) => return Ok((client, credential.username.clone())),
                Ok(None) => continue, // permission denied, try next credential
                Err(e) => return Err(e),
            }
        }

        Err(Error::AuthFailed {
            attempted: self.credentials.len(),
        })
    }

    /// Returns `Ok(Some(client))` on success, `Ok(None)` on a clean
    /// permission-denied rejection (try the next credential), `Err` for
    /// anything else (connect timeout, transport error).
    async fn connect_and_authenticate(
        &self,
        host: &str,
        port: u16,
        credential: &Credential,
        runtime: &Runtime,
        tunnel_name: Option<&str>,
    ) -> Result<Option<SshClient>> {
        let mut client = match tunnel_name {
            Some(name) => {
                let stream = runtime.jump_hosts.open_tunnel(name, host, port).await?;
                SshClient::connect_via_tunnel(stream, self.policy.timeout).await?
            }
            None => SshClient::connect(host, port, self.policy.timeout).await?,
        };

        let ok = client
            .authenticate_password(&credential.username, &credential.password)
            .await?;
        if !ok {
            return Ok(None);
        }
        Ok(Some(client))
    }

    /// `test_login(timeout)`: returns the username that succeeded, or an
    /// `AuthFailed` error on permission-denied; other errors propagate.
    pub async fn test_login(&self, runtime: &Runtime) -> Result<String> {
        let (_client, username) = self.login(runtime).await?;
        Ok(username)
    }

    /// `backup_config()`: runs the full capture protocol and returns the
    /// raw captured text (linting/persisting is the op driver's job).
    pub async fn capture(&self, runtime: &Runtime) -> Result<String> {
        let (client, _username) = self.login(runtime).await?;

        let raw = match capture_mode(&self.policy) {
            CaptureMode::Exec => self.capture_exec(&client).await,
            CaptureMode::Interactive => self.capture_interactive(&client).await,
        };
        raw
    }

    async fn capture_exec(&self, client: &SshClient) -> Result<String> {
        let output = client.exec(&self.policy.get_config, self.policy.timeout).await?;
        let normalized = output.replace("\r\n", "\n");
        let command = &self.policy.get_config;
        match normalized.find(command.as_str()) {
            Some(pos) => {
                let mut start = pos + command.len();
                if normalized[start..].starts_with('\n') {
                    start += 1;
                }
                Ok(strip_cr(&normalized[start..]))
            }
            None => Ok(strip_cr(&normalized)),
        }
    }

    async fn capture_interactive(&self, client: &SshClient) -> Result<String> {
        let mut session = client.open_shell(PTY_TERM_TYPE).await?;

        session
            .read_until(PROMPT_WAIT_TIMEOUT, |text| {
                prompt::is_at_prompt(&self.prompt_re, text)
            })
            .await
            .map_err(|_| Error::Timeout { phase: Phase::Prompt })?;

        if self.policy.connector == ConnectorKind::Prompted {
            self.run_prompted_login(&mut session).await?;
        }

        for command in &self.policy.pre_get_config {
            session.write_line(command).await?;
            session
                .read_until(PRE_CAPTURE_TIMEOUT, |text| {
                    prompt::is_at_prompt(&self.prompt_re, text)
                })
                .await
                .map_err(|_| Error::Timeout {
                    phase: Phase::PreCapture,
                })?;
        }

        session.write_line(&self.policy.get_config).await?;
        let raw = session
            .read_until(self.policy.timeout, |text| {
                prompt::is_at_prompt(&self.prompt_re, text)
            })
            .await
            .map_err(|_| Error::Timeout { phase: Phase::Capture })?;

        let _ = session.close().await;

        Ok(strip_cr(&extract_capture_body(&raw, &self.policy.get_config)))
    }

    /// Banner-style `User:`/`Password:` dance for the "prompted" connector
    /// kind, run after SSH auth succeeds and before the normal prompt wait.
    async fn run_prompted_login(&self, session: &mut crate::connection::russh::InteractiveSession) -> Result<()> {
        let credential = self
            .credentials
            .first()
            .ok_or_else(|| Error::config("no credential available for prompted login"))?;

        session
            .read_until(PROMPTED_LOGIN_TIMEOUT, |text| text.trim_end().ends_with("User:"))
            .await
            .map_err(|_| Error::Timeout { phase: Phase::Connect })?;
        session.write_line(&credential.username).await?;

        session
            .read_until(PROMPTED_LOGIN_TIMEOUT, |text| {
                text.trim_end().ends_with("Password:")
            })
            .await
            .map_err(|_| Error::Timeout { phase: Phase::Connect })?;
        session.write_line(&credential.password).await?;

        Ok(())
    }
}

/// Extracts the capture command's output from the raw interactive read: the
/// text between the echoed command line and the trailing prompt line.
fn extract_capture_body(raw: &str, command: &str) -> String {
    let after_echo = match raw.find(command) {
        Some(pos) => {
            let mut start = pos + command.len();
            if raw[start..].starts_with('\n') {
                start += 1;
            }
            &raw[start..]
        }
        None => raw,
    };
    // Drop the trailing prompt line.
    match after_echo.rfind('\n') {
        Some(pos) => after_echo[..pos].to_string(),
        None => after_echo.to_string(),
    }
}

fn strip_cr(text: &str) -> String {
    text.replace('\r', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, OsPolicy};
    use indexmap::IndexMap;

    fn record(fields: &[(&str, &str)]) -> Record {
        let mut map = IndexMap::new();
        for (k, v) in fields {
            map.insert((*k).to_string(), (*v).to_string());
        }
        Record::new(map)
    }

    #[test]
    fn credential_order_is_record_policy_default_global() {
        let mut config = Config::default();
        config.credentials.push(Credential {
            username: "global1".into(),
            password: "g1".into(),
        });
        config.defaults.username = Some("defuser".into());
        config.defaults.password = Some("defpass".into());
        let policy = OsPolicy {
            credentials: vec![Credential {
                username: "osuser".into(),
                password: "ospass".into(),
            }],
            ..Default::default()
        };
        let r = record(&[("host", "sw1"), ("username", "recuser"), ("password", "recpass")]);

        let creds = resolve_credentials(&r, &policy, &config);
        let usernames: Vec<_> = creds.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(usernames, vec!["recuser", "osuser", "defuser", "global1"]);
    }

    #[test]
    fn empty_credentials_is_a_config_error() {
        let config = Config::default();
        let r = record(&[("host", "sw1"), ("os_name", "eos")]);
        assert!(Connector::new(r, &config).is_err());
    }

    #[test]
    fn capture_mode_is_exec_without_pre_capture() {
        let policy = OsPolicy::default();
        assert!(matches!(capture_mode(&policy), CaptureMode::Exec));
    }

    #[test]
    fn capture_mode_is_interactive_with_pre_capture() {
        let policy = OsPolicy {
            pre_get_config: vec!["terminal length 0".into()],
            ..Default::default()
        };
        assert!(matches!(capture_mode(&policy), CaptureMode::Interactive));
    }

    #[test]
    fn exec_body_extraction_finds_first_occurrence_and_strips_cr() {
        let raw = "show running-config\r\nhostname sw1\r\n!\r\n".replace("\r\n", "\n");
        let body = extract_capture_body(&raw, "show running-config");
        assert_eq!(body, "hostname sw1\n!");
    }
}
