//! Subcommand implementations, each threaded through a shared [`Context`]
//! resolved once per invocation from the CLI's global options.

pub mod inventory;
pub mod vcs;

use crate::cli::Cli;
use crate::config::Config;
use crate::connector::Connector;
use crate::consts::DEFAULT_PROBE_TIMEOUT;
use crate::error::{Error, Result};
use crate::inventory::filter::Predicate;
use crate::inventory::Inventory;
use crate::linter::lint;
use crate::report::Report;
use crate::scheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::info;

/// Config + filtered inventory + the run-shaping options every fan-out
/// command needs, resolved once at the top of `main`.
pub struct Context {
    pub config: Config,
    pub inventory: Inventory,
    pub batch: usize,
    pub overall_timeout: Option<Duration>,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;

        let inventory_path = cli
            .inventory
            .clone()
            .or_else(|| config.defaults.inventory.clone())
            .ok_or_else(|| Error::inventory("no inventory given (-i/--inventory or [defaults].inventory)"))?;
        let mut inventory = Inventory::load(&inventory_path)?;

        if !cli.limit.is_empty() {
            inventory = inventory.filtered(&Predicate::compile(&cli.limit, true, inventory.header())?);
        }
        if !cli.exclude.is_empty() {
            inventory = inventory.filtered(&Predicate::compile(&cli.exclude, false, inventory.header())?);
        }
        if inventory.is_empty() {
            return Err(Error::EmptyInventory);
        }

        Ok(Self {
            config,
            inventory,
            batch: cli.batch as usize,
            overall_timeout: (cli.timeout > 0).then(|| Duration::from_secs(u64::from(cli.timeout))),
        })
    }
}

/// `probe`: bare TCP reachability (C9), independent of credentials and
/// jump-hosts — every record is checked directly, bounded only by `batch`.
pub async fn probe(ctx: &Context) -> Report {
    let total = ctx.inventory.len();
    info!(total, "checking SSH reachability");
    let timeout = DEFAULT_PROBE_TIMEOUT;

    let mut report = Report::start(total);
    let mut remaining: Vec<_> = ctx.inventory.records().to_vec();
    remaining.reverse();
    let mut tasks: JoinSet<(String, String, Result<bool>)> = JoinSet::new();
    let mut done = 0usize;

    loop {
        while tasks.len() < ctx.batch.max(1) {
            let Some(record) = remaining.pop() else { break };
            let Ok(host) = record.display_name().map(str::to_string) else {
                report.record_failure("<unknown>", "", &Error::inventory("record has neither 'host' nor 'ipaddr'"));
                continue;
            };
            let os_name = record.os_name().unwrap_or_default().to_string();
            let target = record
                .ipaddr()
                .or_else(|| record.host())
                .unwrap_or(&host)
                .to_string();
            tasks.spawn(async move {
                let ok = crate::probe::probe(&target, crate::consts::DEFAULT_SSH_PORT, timeout, true).await;
                (host, os_name, ok)
            });
        }

        if tasks.is_empty() {
            break;
        }

        match tasks.join_next().await {
            Some(Ok((host, os_name, result))) => {
                done += 1;
                match result {
                    Ok(true) => {
                        info!(host = %host, "DONE ({done}/{total}): PASS");
                        report.record_success();
                    }
                    Ok(false) => {
                        info!(host = %host, "DONE ({done}/{total}): FAIL");
                        report.record_failure(&host, &os_name, &Error::protocol("unreachable"));
                    }
                    Err(e) => {
                        info!(host = %host, "DONE ({done}/{total}): FAIL ({e})");
                        report.record_failure(&host, &os_name, &e);
                    }
                }
            }
            Some(Err(join_err)) => {
                tracing::warn!(error = %join_err, "probe task panicked or was aborted");
            }
            None => break,
        }
    }

    report.finish();
    report
}

/// `login`: verifies SSH login against every host without capturing config.
pub async fn login(ctx: &Context) -> Result<Report> {
    let runtime = Arc::new(scheduler::build_runtime(&ctx.config, &ctx.inventory).await?);
    let report = scheduler::run_for_each(
        &ctx.inventory,
        &ctx.config,
        runtime,
        ctx.batch,
        ctx.overall_timeout,
        |connector, runtime| async move {
            let username = connector.test_login(&runtime).await?;
            info!(host = connector.name(), user = %username, "login succeeded");
            Ok(())
        },
    )
    .await;
    Ok(report)
}

/// `backup`: the full capture → lint → persist pipeline per host.
pub async fn backup(ctx: &Context) -> Result<Report> {
    let configs_dir = ctx
        .config
        .defaults
        .configs_dir
        .clone()
        .ok_or_else(|| Error::config("no configs_dir resolvable (set [defaults].configs_dir)"))?;
    let config = ctx.config.clone();
    let configs_dir = Arc::new(configs_dir);
    let config = Arc::new(config);

    let runtime = Arc::new(scheduler::build_runtime(&ctx.config, &ctx.inventory).await?);
    let report = scheduler::run_for_each(
        &ctx.inventory,
        &ctx.config,
        runtime,
        ctx.batch,
        ctx.overall_timeout,
        move |connector, runtime| {
            let configs_dir = Arc::clone(&configs_dir);
            let config = Arc::clone(&config);
            async move { run_one_backup(&connector, &runtime, &config, &configs_dir).await }
        },
    )
    .await;
    Ok(report)
}

async fn run_one_backup(
    connector: &Connector,
    runtime: &crate::connector::Runtime,
    config: &Config,
    configs_dir: &std::path::Path,
) -> Result<()> {
    let raw = connector.capture(runtime).await?;

    let policy = config.os_policy(connector.os_name());
    let linted = match &policy.linter {
        Some(name) => {
            let spec = config
                .linters
                .get(name)
                .cloned()
                .ok_or_else(|| Error::config(format!("unknown linter '{name}'")))?;
            lint(&raw, &spec)?
        }
        None => raw,
    };

    crate::persist::save_config(configs_dir, connector.name(), &linted)?;
    info!(host = connector.name(), "backup saved");
    Ok(())
}
