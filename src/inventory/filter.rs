//! Filter expression compilation, grounded on `netcfgbu/filtering.py`'s
//! `create_filter`.
//!
//! Three constraint forms are accepted:
//! 1. `field=regex` — case-insensitive, anchored regex match on that field.
//! 2. `ipaddr=cidr_or_ip` — numeric membership when the field is literally
//!    `ipaddr`; a value that doesn't parse as an address or network is a
//!    `ConfigError`, not a silent fall-through to a regex match.
//! 3. `@path` — the path must name a `.csv` file with a `host` column; the
//!    constraint matches records whose `host` appears in that file.
//!
//! `field=...`/`ipaddr=...` constraints are validated against the
//! inventory's actual header at compile time, matching `create_filter`'s
//! `^(keyword|...)=value` construction from `field_names`: a constraint
//! naming a column the inventory doesn't have is a `ConfigError`, not a
//! predicate that silently never matches.

use crate::error::{Error, Result};
use crate::inventory::Record;
use ipnet::IpNet;
use regex::Regex;
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;

enum Constraint {
    /// Plain field=regex match, anchored at both ends, case-insensitive.
    FieldRegex { field: String, regex: Regex },
    /// `ipaddr=<cidr-or-ip>` — numeric membership test.
    IpNet { field: String, net: IpNet },
    /// `@path` — host-list membership.
    HostList(HashSet<String>),
}

impl Constraint {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Constraint::FieldRegex { field, regex } => record
                .get(field)
                .map(|value| regex.is_match(value))
                .unwrap_or(false),
            Constraint::IpNet { field, net } => record
                .get(field)
                .and_then(|value| value.parse::<IpAddr>().ok())
                .map(|addr| net.contains(&addr))
                .unwrap_or(false),
            Constraint::HostList(hosts) => record
                .host()
                .map(|host| hosts.contains(host))
                .unwrap_or(false),
        }
    }
}

/// A compiled filter: a list of constraints plus whether matching records
/// should be kept (`include = true`) or dropped (`include = false`).
pub struct Predicate {
    constraints: Vec<Constraint>,
    include: bool,
}

impl Predicate {
    /// Compiles `constraints` (each a raw `field=value` or `@path` string)
    /// into a predicate, validating every `field=value` constraint's field
    /// name against `known_fields` (the inventory header). With
    /// `include=true` a record is kept when *all* constraints match; with
    /// `include=false` a record is dropped when *any* constraint matches.
    pub fn compile(constraints: &[String], include: bool, known_fields: &[String]) -> Result<Self> {
        let constraints = constraints
            .iter()
            .map(|raw| compile_one(raw, known_fields))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            constraints,
            include,
        })
    }

    /// A predicate with no constraints matches (and thus keeps) everything.
    pub fn all() -> Self {
        Self {
            constraints: Vec::new(),
            include: true,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.constraints.is_empty() {
            return true;
        }
        if self.include {
            self.constraints.iter().all(|c| c.matches(record))
        } else {
            !self.constraints.iter().any(|c| c.matches(record))
        }
    }
}

fn compile_one(raw: &str, known_fields: &[String]) -> Result<Constraint> {
    if let Some(path) = raw.strip_prefix('@') {
        return compile_host_list(Path::new(path));
    }

    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| Error::config(format!("invalid filter constraint: '{raw}'")))?;

    if !known_fields.iter().any(|f| f == field) {
        return Err(Error::config(format!(
            "unknown filter field '{field}' in '{raw}'"
        )));
    }

    if field == "ipaddr" {
        let net = parse_ip_or_cidr(value)
            .map_err(|()| Error::config(format!("invalid ipaddr filter value in '{raw}'")))?;
        return Ok(Constraint::IpNet {
            field: field.to_string(),
            net,
        });
    }

    let pattern = format!("(?i)^{value}$");
    let regex = Regex::new(&pattern)
        .map_err(|e| Error::config(format!("invalid regex in filter '{raw}': {e}")))?;
    Ok(Constraint::FieldRegex {
        field: field.to_string(),
        regex,
    })
}

fn parse_ip_or_cidr(value: &str) -> std::result::Result<IpNet, ()> {
    if let Ok(net) = value.parse::<IpNet>() {
        return Ok(net);
    }
    if let Ok(addr) = value.parse::<IpAddr>() {
        return IpNet::new(addr, if addr.is_ipv4() { 32 } else { 128 }).map_err(|_| ());
    }
    Err(())
}

fn compile_host_list(path: &Path) -> Result<Constraint> {
    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
        return Err(Error::config(format!(
            "not a CSV file: '{}'",
            path.display()
        )));
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("cannot read filter file '{}': {e}", path.display())))?;
    let filtered: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(filtered.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::config(format!("invalid filter file '{}': {e}", path.display())))?
        .clone();
    let host_idx = headers
        .iter()
        .position(|h| h == "host")
        .ok_or_else(|| Error::config(format!("filter file '{}' has no 'host' column", path.display())))?;

    let mut hosts = HashSet::new();
    for row in reader.records() {
        let row = row.map_err(|e| Error::config(format!("invalid row in filter file: {e}")))?;
        if let Some(host) = row.get(host_idx) {
            hosts.insert(host.to_string());
        }
    }
    Ok(Constraint::HostList(hosts))
}
