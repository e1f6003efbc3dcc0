//! Jump-host (bastion) matching and tunnel management (C3), grounded on
//! `netcfgbu/jumphosts.py`.
//!
//! A single-level proxy is all the spec requires — no multi-hop chaining.
//! Each configured jump-host is compiled into a matcher over the inventory's
//! include/exclude filter lists; after matching every record, only the
//! jump-hosts that matched at least one record ("required") are dialed.

use crate::config::JumpHostSpec;
use crate::connection::russh::SshClient;
use crate::error::{Error, Result};
use crate::inventory::filter::Predicate;
use crate::inventory::{Inventory, Record};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;

/// `[user@]host[:port]`, parsed once at matcher-construction time.
#[derive(Debug, Clone)]
pub struct ProxyEndpoint {
    pub user: Option<String>,
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn parse(proxy: &str) -> Result<Self> {
        let (user, rest) = match proxy.split_once('@') {
            Some((u, r)) => (Some(u.to_string()), r),
            None => (None, proxy),
        };
        let (host, port) = match rest.rsplit_once(':') {
            Some((h, p)) => (
                h.to_string(),
                p.parse::<u16>()
                    .map_err(|_| Error::config(format!("invalid proxy port in '{proxy}'")))?,
            ),
            None => (rest.to_string(), crate::consts::DEFAULT_SSH_PORT),
        };
        if host.is_empty() {
            return Err(Error::config(format!("invalid proxy spec '{proxy}'")));
        }
        Ok(Self { user, host, port })
    }
}

struct Matcher {
    spec: JumpHostSpec,
    /// `include=true` predicate: record must satisfy every `include` constraint.
    include: Predicate,
    /// `include=false` predicate over the `exclude` constraints: already
    /// returns `false` the moment any of them matches.
    exclude: Predicate,
}

impl Matcher {
    fn accepts(&self, record: &Record) -> bool {
        self.include.matches(record) && self.exclude.matches(record)
    }
}

/// Lazily-dialed tunnel to one proxy endpoint, dialed at most once and
/// shared by every record routed through it.
struct Tunnel {
    client: OnceCell<Result<SshClient>>,
    endpoint: ProxyEndpoint,
    timeout: Duration,
}

/// Owns the compiled matchers and the (at most once per endpoint) dialed
/// tunnels for a run. Built once before any connector task starts and
/// read-only thereafter, per the concurrency model.
pub struct JumpHostManager {
    matchers: Vec<Matcher>,
    tunnels: HashMap<String, Tunnel>,
}

impl JumpHostManager {
    /// Compiles every configured jump-host spec against `inventory`, then
    /// keeps only the ones matching at least one record (the "required"
    /// set).
    pub fn build(specs: &[JumpHostSpec], inventory: &Inventory) -> Result<Self> {
        let mut matchers = Vec::new();
        let mut tunnels = HashMap::new();

        for spec in specs {
            let endpoint = ProxyEndpoint::parse(&spec.proxy)?;
            let include = Predicate::compile(&spec.include, true, inventory.header())?;
            let exclude = Predicate::compile(&spec.exclude, false, inventory.header())?;
            let matcher = Matcher {
                spec: spec.clone(),
                include,
                exclude,
            };

            let required = inventory.records().iter().any(|r| matcher.accepts(r));
            if required {
                tunnels.insert(
                    spec.name.clone(),
                    Tunnel {
                        client: OnceCell::new(),
                        endpoint,
                        timeout: spec.timeout,
                    },
                );
                matchers.push(matcher);
            }
        }

        Ok(Self { matchers, tunnels })
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Returns the required jump-host name this record should route
    /// through, if any — the first matcher (in configuration order) that
    /// accepts it.
    pub fn route_for(&self, record: &Record) -> Option<&str> {
        self.matchers
            .iter()
            .find(|m| m.accepts(record))
            .map(|m| m.spec.name.as_str())
    }

    /// Dials every required jump-host exactly once. Returns the names of
    /// any that failed to dial; those records are later failed fast with
    /// `JumpHostError` rather than aborting the whole run.
    pub async fn connect_all(&self) -> Vec<String> {
        let mut failed = Vec::new();
        for (name, tunnel) in &self.tunnels {
            let result = tunnel
                .client
                .get_or_init(|| async {
                    SshClient::connect(&tunnel.endpoint.host, tunnel.endpoint.port, tunnel.timeout)
                        .await
                })
                .await;
            if result.is_err() {
                failed.push(name.clone());
            }
        }
        failed
    }

    /// Opens a fresh tunnel channel through the named (already-dialed)
    /// jump-host to `(target_host, target_port)`. Using an unconnected
    /// jump-host is a programming error in the scheduler, surfaced as
    /// `JumpHostError`.
    pub async fn open_tunnel(
        &self,
        name: &str,
        target_host: &str,
        target_port: u16,
    ) -> Result<impl tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static> {
        let tunnel = self
            .tunnels
            .get(name)
            .ok_or_else(|| Error::jump_host(format!("jump-host '{name}' is not required")))?;
        match tunnel.client.get() {
            Some(Ok(client)) => client.open_tunnel(target_host, target_port).await,
            _ => Err(Error::jump_host(format!("jump-host '{name}' unavailable"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn record(host: &str, os_name: &str) -> Record {
        let mut fields = IndexMap::new();
        fields.insert("host".to_string(), host.to_string());
        fields.insert("os_name".to_string(), os_name.to_string());
        Record::new(fields)
    }

    fn inventory(records: Vec<Record>) -> Inventory {
        let raw_header = "host,os_name\n";
        let mut rows = String::from(raw_header);
        for r in &records {
            rows.push_str(&format!(
                "{},{}\n",
                r.host().unwrap(),
                r.os_name().unwrap()
            ));
        }
        Inventory::parse(&rows).unwrap()
    }

    #[test]
    fn proxy_endpoint_parses_user_host_port() {
        let ep = ProxyEndpoint::parse("admin@jump1.example.com:2222").unwrap();
        assert_eq!(ep.user.as_deref(), Some("admin"));
        assert_eq!(ep.host, "jump1.example.com");
        assert_eq!(ep.port, 2222);
    }

    #[test]
    fn proxy_endpoint_defaults_port_22() {
        let ep = ProxyEndpoint::parse("jump1.example.com").unwrap();
        assert_eq!(ep.port, 22);
        assert!(ep.user.is_none());
    }

    #[test]
    fn jumphost_required_iff_matching_record_exists() {
        let inv = inventory(vec![record("sw1", "eos"), record("sw2", "ios")]);
        let spec = JumpHostSpec {
            name: "jh1".to_string(),
            proxy: "jump1.example.com".to_string(),
            include: vec!["os_name=eos".to_string()],
            exclude: vec![],
            timeout: Duration::from_secs(10),
        };
        let manager = JumpHostManager::build(&[spec], &inv).unwrap();
        assert!(!manager.is_empty());

        let sw1 = record("sw1", "eos");
        let sw2 = record("sw2", "ios");
        assert_eq!(manager.route_for(&sw1), Some("jh1"));
        assert_eq!(manager.route_for(&sw2), None);
    }

    #[test]
    fn jumphost_not_required_when_no_record_matches() {
        let inv = inventory(vec![record("sw2", "ios")]);
        let spec = JumpHostSpec {
            name: "jh1".to_string(),
            proxy: "jump1.example.com".to_string(),
            include: vec!["os_name=eos".to_string()],
            exclude: vec![],
            timeout: Duration::from_secs(10),
        };
        let manager = JumpHostManager::build(&[spec], &inv).unwrap();
        assert!(manager.is_empty());
    }
}
