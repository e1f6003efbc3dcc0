//! Fan-out scheduler (C7), grounded on the task-spawning and backpressure
//! patterns of the teacher's async runtime module, scoped down to this
//! crate's single need: run one operation per inventory record, bounded by
//! `--batch` concurrent tasks and `max_startups` concurrent logins, folding
//! every outcome into a [`Report`] without letting one host's failure abort
//! the run.

use crate::config::Config;
use crate::connection::jump_host::JumpHostManager;
use crate::connector::{Connector, Runtime};
use crate::error::{Error, Phase, Result};
use crate::inventory::Inventory;
use crate::report::Report;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Builds the shared [`Runtime`] for a run: the max-startups semaphore and
/// the jump-host registry, dialing every required jump-host once up front.
pub async fn build_runtime(config: &Config, inventory: &Inventory) -> Result<Runtime> {
    let jump_hosts = JumpHostManager::build(&config.jumphosts, inventory)?;
    if !jump_hosts.is_empty() {
        let failed = jump_hosts.connect_all().await;
        for name in &failed {
            warn!(jump_host = %name, "failed to dial jump-host; dependent hosts will fail fast");
        }
    }
    Ok(Runtime {
        semaphore: Arc::new(Semaphore::new(config.max_startups())),
        jump_hosts: Arc::new(jump_hosts),
    })
}

/// Builds one [`Connector`] per record against `config`, runs `op` on each
/// under `runtime` (at most `batch` concurrently), and folds the results
/// into a [`Report`]. Records that fail to construct a connector (e.g. an
/// empty credential list) are reported as failures without ever being
/// scheduled. When `overall_timeout` elapses, the fan-out is abandoned and
/// every host that has not yet reported an outcome — whether mid-flight or
/// never scheduled — is recorded as an `Error::Timeout { phase: Overall }`
/// failure, bringing the whole run to a terminal state.
pub async fn run_for_each<F, Fut>(
    inventory: &Inventory,
    config: &Config,
    runtime: Arc<Runtime>,
    batch: usize,
    overall_timeout: Option<Duration>,
    op: F,
) -> Report
where
    F: Fn(Arc<Connector>, Arc<Runtime>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut report = Report::start(inventory.len());
    let op = Arc::new(op);
    let total = inventory.len();

    let mut remaining = Vec::with_capacity(total);
    for record in inventory.records() {
        match Connector::new(record.clone(), config) {
            Ok(connector) => remaining.push(connector),
            Err(e) => {
                report.record_failure(
                    record.display_name().unwrap_or("<unknown>"),
                    record.os_name().unwrap_or(""),
                    &e,
                );
            }
        }
    }
    remaining.reverse();

    let scheduled: Vec<(String, String)> = remaining
        .iter()
        .map(|c| (c.name().to_string(), c.os_name().to_string()))
        .collect();

    let outcomes: Arc<Mutex<Vec<(String, String, Result<()>)>>> =
        Arc::new(Mutex::new(Vec::with_capacity(total)));
    let fold = fold_results(remaining, batch, op, runtime, total, Arc::clone(&outcomes));

    match overall_timeout {
        Some(deadline) => {
            if tokio::time::timeout(deadline, fold).await.is_err() {
                warn!(timeout = ?deadline, "overall run timeout elapsed; outstanding hosts marked as timed out");
            }
        }
        None => fold.await,
    }

    let finished = std::mem::take(&mut *outcomes.lock().unwrap());
    let reported: HashSet<&str> = finished.iter().map(|(host, _, _)| host.as_str()).collect();

    for (host, os_name, result) in &finished {
        match result {
            Ok(()) => report.record_success(),
            Err(e) => report.record_failure(host, os_name, e),
        }
    }
    for (host, os_name) in &scheduled {
        if !reported.contains(host.as_str()) {
            report.record_failure(host, os_name, &Error::Timeout { phase: Phase::Overall });
        }
    }

    report.finish();
    report
}

/// Drives the bounded fan-out: keeps up to `batch` connector tasks in
/// flight, logging a `DONE (k/N)` line as each completes, and pushing every
/// outcome into `outcomes` as it arrives — so that if this future is
/// dropped mid-run (the overall timeout elapsing), whatever has completed
/// so far is still visible to the caller.
async fn fold_results<F, Fut>(
    mut remaining: Vec<Connector>,
    batch: usize,
    op: Arc<F>,
    runtime: Arc<Runtime>,
    total: usize,
    outcomes: Arc<Mutex<Vec<(String, String, Result<()>)>>>,
) where
    F: Fn(Arc<Connector>, Arc<Runtime>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut tasks: JoinSet<(String, String, Result<()>)> = JoinSet::new();
    let mut done = 0usize;

    loop {
        while tasks.len() < batch.max(1) {
            let Some(connector) = remaining.pop() else { break };
            let connector = Arc::new(connector);
            let runtime = Arc::clone(&runtime);
            let op = Arc::clone(&op);
            let host = connector.name().to_string();
            let os_name = connector.os_name().to_string();
            tasks.spawn(async move {
                let result = op(Arc::clone(&connector), runtime).await;
                (host, os_name, result)
            });
        }

        if tasks.is_empty() {
            break;
        }

        match tasks.join_next().await {
            Some(Ok((host, os_name, result))) => {
                done += 1;
                match &result {
                    Ok(()) => info!(host = %host, "DONE ({done}/{total}): PASS"),
                    Err(e) => info!(host = %host, "DONE ({done}/{total}): FAIL ({e})"),
                }
                outcomes.lock().unwrap().push((host, os_name, result));
            }
            Some(Err(join_err)) => {
                warn!(error = %join_err, "connector task panicked or was aborted");
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Credential};

    fn inventory_with(hosts: &[&str]) -> Inventory {
        let mut rows = String::from("host,os_name\n");
        for h in hosts {
            rows.push_str(&format!("{h},eos\n"));
        }
        Inventory::parse(&rows).unwrap()
    }

    fn config_with_admin_credential() -> Config {
        let mut config = Config::default();
        config.credentials.push(Credential {
            username: "admin".into(),
            password: "admin".into(),
        });
        config
    }

    #[tokio::test]
    async fn runs_every_record_and_counts_success() {
        let inventory = inventory_with(&["sw1", "sw2", "sw3"]);
        let config = config_with_admin_credential();
        let runtime = Arc::new(build_runtime(&config, &inventory).await.unwrap());

        let report = run_for_each(&inventory, &config, runtime, 2, None, |_connector, _runtime| async move {
            Ok(())
        })
        .await;

        assert_eq!(report.total(), 3);
        assert_eq!(report.ok(), 3);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn records_per_host_failures_without_aborting_others() {
        let inventory = inventory_with(&["sw1", "sw2"]);
        let config = config_with_admin_credential();
        let runtime = Arc::new(build_runtime(&config, &inventory).await.unwrap());

        let report = run_for_each(&inventory, &config, runtime, 2, None, |connector, _runtime| async move {
            if connector.name() == "sw1" {
                Err(crate::error::Error::protocol("boom"))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.ok(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures()[0].host, "sw1");
    }

    #[tokio::test]
    async fn empty_credential_list_is_reported_without_being_scheduled() {
        let inventory = inventory_with(&["sw1"]);
        let config = Config::default(); // no credentials anywhere
        let runtime = Arc::new(build_runtime(&config, &inventory).await.unwrap());

        let report = run_for_each(&inventory, &config, runtime, 2, None, |_connector, _runtime| async move {
            Ok(())
        })
        .await;

        assert_eq!(report.total(), 1);
        assert_eq!(report.ok(), 0);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn overall_timeout_records_every_outstanding_host_as_a_timeout_failure() {
        let inventory = inventory_with(&["sw1", "sw2"]);
        let config = config_with_admin_credential();
        let runtime = Arc::new(build_runtime(&config, &inventory).await.unwrap());

        let report = run_for_each(
            &inventory,
            &config,
            runtime,
            2,
            Some(Duration::from_millis(30)),
            |_connector, _runtime| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        assert_eq!(report.total(), 2);
        assert_eq!(report.ok(), 0);
        assert_eq!(report.failed(), 2);
        assert!(report
            .failures()
            .iter()
            .all(|f| f.reason.contains("TIMEOUT")));
    }
}
