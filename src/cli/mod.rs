//! The `netcfgbu` command-line interface: argument parsing only. Command
//! bodies live under [`commands`].

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// netcfgbu - concurrent SSH-based network device configuration backup.
#[derive(Parser, Debug)]
#[command(name = "netcfgbu")]
#[command(version)]
#[command(about = "Backs up network device configurations over SSH", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file (default: $NETCFGBU_CONFIG or ./netcfgbu.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the inventory CSV file
    #[arg(short = 'i', long, global = true)]
    pub inventory: Option<PathBuf>,

    /// Limit to hosts matching `field=regex`, `ipaddr=cidr`, or `@hosts.csv` (repeatable)
    #[arg(short = 'l', long = "limit", global = true, action = clap::ArgAction::Append)]
    pub limit: Vec<String>,

    /// Exclude hosts matching `field=regex`, `ipaddr=cidr`, or `@hosts.csv` (repeatable)
    #[arg(short = 'e', long = "exclude", global = true, action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Maximum number of hosts processed concurrently
    #[arg(short = 'b', long, global = true, value_parser = clap::value_parser!(u32).range(1..=500), default_value = "50")]
    pub batch: u32,

    /// Overall run timeout in seconds (0 disables the overall deadline)
    #[arg(short = 't', long, global = true, value_parser = clap::value_parser!(u32).range(0..=300), default_value = "0")]
    pub timeout: u32,

    /// Raise SSH transport logging verbosity (1-3)
    #[arg(long = "debug-ssh", global = true, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub debug_ssh: Option<u8>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe every inventory host for bare TCP reachability, no SSH login.
    Probe,

    /// Log into every inventory host and report which credential succeeded.
    Login,

    /// Log in, capture the running configuration, lint it, and save it.
    Backup,

    /// Inventory inspection and building.
    #[command(subcommand)]
    Inventory(commands::inventory::InventoryCommand),

    /// Git post-processing of the configs directory.
    #[command(subcommand)]
    Vcs(commands::vcs::VcsCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backup_with_global_options() {
        let cli = Cli::try_parse_from([
            "netcfgbu", "-i", "hosts.csv", "-l", "os_name=eos", "-b", "10", "backup",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Backup));
        assert_eq!(cli.inventory, Some(PathBuf::from("hosts.csv")));
        assert_eq!(cli.limit, vec!["os_name=eos".to_string()]);
        assert_eq!(cli.batch, 10);
    }

    #[test]
    fn batch_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["netcfgbu", "-b", "501", "probe"]).is_err());
    }

    #[test]
    fn parses_inventory_and_vcs_subcommands() {
        let cli = Cli::try_parse_from(["netcfgbu", "inventory", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Inventory(commands::inventory::InventoryCommand::List)
        ));

        let cli = Cli::try_parse_from(["netcfgbu", "vcs", "status"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Vcs(commands::vcs::VcsCommand::Status)
        ));
    }
}
