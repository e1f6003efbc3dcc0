//! netcfgbu - concurrent SSH-based network device configuration backup.
//!
//! Parses arguments, loads configuration, wires up logging, dispatches to
//! the requested operation, and prints the run summary.

use clap::Parser;
use netcfgbu::cli::commands::{inventory, vcs, Context};
use netcfgbu::cli::{Cli, Commands};
use netcfgbu::config::Config;
use netcfgbu::error::Error;
use netcfgbu::report::Report;
use is_terminal::IsTerminal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: &Cli) -> Result<i32, Error> {
    match &cli.command {
        Commands::Inventory(inventory::InventoryCommand::Build) => {
            let config = Config::load(cli.config.as_deref())?;
            init_logging(&config, cli.debug_ssh);
            let spec = config
                .inventory
                .as_ref()
                .ok_or_else(|| Error::config("no [inventory] section in the configuration file"))?;
            inventory::build(spec)?;
            return Ok(0);
        }
        Commands::Vcs(cmd) => {
            let config = Config::load(cli.config.as_deref())?;
            init_logging(&config, cli.debug_ssh);
            let git = config
                .git
                .as_ref()
                .ok_or_else(|| Error::config("no [git] section in the configuration file"))?;
            let dir = config
                .defaults
                .configs_dir
                .clone()
                .ok_or_else(|| Error::config("no configs_dir resolvable (set [defaults].configs_dir)"))?;
            let result = match cmd {
                vcs::VcsCommand::Prepare => vcs::prepare(&dir, git),
                vcs::VcsCommand::Save => vcs::save(&dir, git),
                vcs::VcsCommand::Status => vcs::status(&dir),
            };
            result.map_err(|e| Error::Other {
                message: "git post-processing failed".to_string(),
                source: Some(e.into()),
            })?;
            return Ok(0);
        }
        _ => {}
    }

    let ctx = Context::load(cli)?;
    init_logging(&ctx.config, cli.debug_ssh);

    let report = match &cli.command {
        Commands::Probe => netcfgbu::cli::commands::probe(&ctx).await,
        Commands::Login => netcfgbu::cli::commands::login(&ctx).await?,
        Commands::Backup => netcfgbu::cli::commands::backup(&ctx).await?,
        Commands::Inventory(inventory::InventoryCommand::List) => {
            inventory::list(&ctx);
            return Ok(0);
        }
        Commands::Inventory(inventory::InventoryCommand::Build) | Commands::Vcs(_) => unreachable!(),
    };

    print_report(&report)?;
    Ok(if report.failed() > 0 { 1 } else { 0 })
}

fn init_logging(config: &Config, debug_ssh: Option<u8>) {
    let base = format!("netcfgbu={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));
    let filter = if debug_ssh.is_some() {
        filter.add_directive("netcfgbu::connection=trace".parse().unwrap())
    } else {
        filter
    };

    let ansi = std::io::stdout().is_terminal();
    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        netcfgbu::config::LogFormat::Json => registry.with(fmt::layer().json()).init(),
        netcfgbu::config::LogFormat::Pretty => registry.with(fmt::layer().with_ansi(ansi)).init(),
    }
}

fn print_report(report: &Report) -> Result<(), Error> {
    println!("{}", report.summary());
    if report.failed() > 0 {
        let dir = std::env::current_dir()?;
        if let Some(path) = report.write_failures_csv(&dir)? {
            println!("failures written to {}", path.display());
        }
    }
    Ok(())
}
