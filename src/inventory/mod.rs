//! Tabular host inventory.
//!
//! An inventory is a flat CSV table with a header row; each row becomes a
//! [`Record`] whose columns are preserved verbatim (including any columns a
//! filter expression or OS policy doesn't know about). Comment lines (first
//! field starting with `#`) are skipped before the CSV parser ever sees them,
//! since the `csv` crate has no native notion of a comment line.

pub mod filter;

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::io::Read;
use std::path::Path;

/// One row of the inventory. Immutable once loaded; a [`crate::connector`]
/// task owns its own clone for the duration of its run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new(fields: IndexMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn host(&self) -> Option<&str> {
        self.get("host")
    }

    pub fn os_name(&self) -> Option<&str> {
        self.get("os_name")
    }

    pub fn ipaddr(&self) -> Option<&str> {
        self.get("ipaddr")
    }

    pub fn username(&self) -> Option<&str> {
        self.get("username").filter(|s| !s.is_empty())
    }

    pub fn password(&self) -> Option<&str> {
        self.get("password").filter(|s| !s.is_empty())
    }

    /// The name used for the persisted artifact and in log/report lines:
    /// `host` if present, otherwise `ipaddr`.
    pub fn display_name(&self) -> Result<&str> {
        self.host()
            .or_else(|| self.ipaddr())
            .ok_or_else(|| Error::inventory("record has neither 'host' nor 'ipaddr'"))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The loaded, read-only inventory for a run.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    header: Vec<String>,
    records: Vec<Record>,
}

impl Inventory {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Loads a CSV inventory file, skipping `#`-prefixed comment lines.
    pub fn load(path: &Path) -> Result<Self> {
        let mut raw = String::new();
        std::fs::File::open(path)
            .map_err(|e| Error::Inventory(format!("cannot open inventory '{}': {e}", path.display())))?
            .read_to_string(&mut raw)
            .map_err(|e| Error::Inventory(format!("cannot read inventory '{}': {e}", path.display())))?;
        Self::parse(&raw)
    }

    /// Parses CSV inventory text, used by [`Self::load`] and by tests.
    pub fn parse(raw: &str) -> Result<Self> {
        let filtered: String = raw
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(filtered.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| Error::Inventory(format!("invalid inventory header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();

        if !header.iter().any(|h| h == "host") || !header.iter().any(|h| h == "os_name") {
            return Err(Error::Inventory(
                "inventory header must contain 'host' and 'os_name' columns".into(),
            ));
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| Error::Inventory(format!("invalid inventory row: {e}")))?;
            let mut fields = IndexMap::new();
            for (key, value) in header.iter().zip(row.iter()) {
                fields.insert(key.clone(), value.to_string());
            }
            records.push(Record::new(fields));
        }

        if records.is_empty() {
            return Err(Error::EmptyInventory);
        }

        Ok(Self { header, records })
    }

    /// Serializes the inventory back to CSV text (used for the round-trip
    /// property and by `inventory list --format=csv`).
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer
            .write_record(&self.header)
            .map_err(|e| Error::inventory(format!("failed to serialize inventory: {e}")))?;
        for record in &self.records {
            let row: Vec<&str> = self
                .header
                .iter()
                .map(|h| record.get(h).unwrap_or(""))
                .collect();
            writer
                .write_record(&row)
                .map_err(|e| Error::inventory(format!("failed to serialize inventory: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::inventory(format!("failed to serialize inventory: {e}")))?;
        String::from_utf8(bytes).map_err(|e| Error::inventory(e.to_string()))
    }

    /// Returns a new inventory retaining only the records the predicate
    /// accepts. Order is preserved.
    pub fn filtered(&self, predicate: &filter::Predicate) -> Self {
        let records = self
            .records
            .iter()
            .filter(|r| predicate.matches(r))
            .cloned()
            .collect();
        Self {
            header: self.header.clone(),
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# a comment line that must be skipped
host,ipaddr,os_name
switch1,10.0.0.1,eos
switch2,10.0.0.2,ios
";

    #[test]
    fn loads_and_skips_comments() {
        let inv = Inventory::parse(SAMPLE).unwrap();
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.records()[0].host(), Some("switch1"));
    }

    #[test]
    fn round_trip_preserves_records() {
        let inv = Inventory::parse(SAMPLE).unwrap();
        let csv = inv.to_csv().unwrap();
        let reloaded = Inventory::parse(&csv).unwrap();
        assert_eq!(inv.records(), reloaded.records());
    }

    #[test]
    fn missing_required_columns_is_rejected() {
        let bad = "a,b\n1,2\n";
        assert!(Inventory::parse(bad).is_err());
    }

    #[test]
    fn empty_inventory_is_rejected() {
        let bad = "host,os_name\n";
        assert!(matches!(Inventory::parse(bad), Err(Error::EmptyInventory)));
    }

    #[test]
    fn display_name_prefers_host_over_ipaddr() {
        let mut fields = IndexMap::new();
        fields.insert("host".to_string(), "sw1".to_string());
        fields.insert("ipaddr".to_string(), "10.0.0.1".to_string());
        let record = Record::new(fields);
        assert_eq!(record.display_name().unwrap(), "sw1");
    }
}
