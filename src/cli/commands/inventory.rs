//! `inventory list` / `inventory build`, grounded on
//! `netcfgbu/cli/inventory.py`.

use super::Context;
use crate::config::InventorySpec;
use crate::error::{Error, Result};
use clap::Subcommand;
use std::collections::BTreeMap;
use std::process::Command;

#[derive(Subcommand, Debug)]
pub enum InventoryCommand {
    /// Print a per-`os_name` summary and the full inventory table.
    List,

    /// Run the configured inventory-build script.
    Build,
}

/// Prints an `os_name` → count summary followed by the full record table.
pub fn list(ctx: &Context) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in ctx.inventory.records() {
        *counts.entry(record.os_name().unwrap_or("")).or_insert(0) += 1;
    }

    println!("SUMMARY: TOTAL={}", ctx.inventory.len());
    println!();
    for (os_name, count) in &counts {
        println!("    {os_name:<20} {count}");
    }
    println!();

    let header = ctx.inventory.header();
    println!("{}", header.join(","));
    for record in ctx.inventory.records() {
        let row: Vec<&str> = header.iter().map(|h| record.get(h).unwrap_or("")).collect();
        println!("{}", row.join(","));
    }
}

/// Invokes the `[inventory]` script, inheriting stdio so it can write the
/// inventory file directly (matching the original's `os.system(script)`).
pub fn build(spec: &InventorySpec) -> Result<()> {
    let status = Command::new(&spec.script)
        .status()
        .map_err(|e| Error::config(format!("failed to run inventory script '{}': {e}", spec.script.display())))?;
    if !status.success() {
        return Err(Error::config(format!(
            "inventory script '{}' exited with {status}",
            spec.script.display()
        )));
    }
    Ok(())
}
