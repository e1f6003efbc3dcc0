//! Command-line integration tests, grounded on the teacher's `cli_tests.rs`
//! (`assert_cmd` driving the compiled binary end-to-end). Every scenario
//! here stays off the network: config/inventory resolution, filter
//! compilation, and `vcs status` against a local directory are all the CLI
//! can exercise without a live SSH peer.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn netcfgbu_cmd() -> Command {
    Command::cargo_bin("netcfgbu").unwrap()
}

fn write_inventory(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

const SAMPLE_INVENTORY: &str = "host,os_name\nsw1,eos\nsw2,ios\nsw3,eos\n";

#[test]
fn version_flag_reports_the_crate_version() {
    netcfgbu_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_is_a_clap_usage_error() {
    netcfgbu_cmd().assert().failure().code(2);
}

#[test]
fn batch_out_of_range_is_rejected() {
    let inventory = write_inventory(SAMPLE_INVENTORY);
    netcfgbu_cmd()
        .arg("-i")
        .arg(inventory.path())
        .arg("-b")
        .arg("501")
        .arg("probe")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn inventory_list_prints_os_summary_and_full_table() {
    let inventory = write_inventory(SAMPLE_INVENTORY);
    netcfgbu_cmd()
        .arg("-i")
        .arg(inventory.path())
        .arg("inventory")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("SUMMARY: TOTAL=3"))
        .stdout(predicate::str::contains("eos"))
        .stdout(predicate::str::contains("sw1,eos"));
}

#[test]
fn limit_filters_the_inventory_before_listing() {
    let inventory = write_inventory(SAMPLE_INVENTORY);
    netcfgbu_cmd()
        .arg("-i")
        .arg(inventory.path())
        .arg("-l")
        .arg("os_name=eos")
        .arg("inventory")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("SUMMARY: TOTAL=2"));
}

#[test]
fn exclude_removes_matching_hosts_before_listing() {
    let inventory = write_inventory(SAMPLE_INVENTORY);
    netcfgbu_cmd()
        .arg("-i")
        .arg(inventory.path())
        .arg("-e")
        .arg("host=sw1")
        .arg("inventory")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("SUMMARY: TOTAL=2"))
        .stdout(predicate::str::contains("sw2").and(predicate::str::contains("sw3")));
}

#[test]
fn missing_inventory_is_reported_as_an_inventory_error() {
    // No -i/--inventory, no config file with [defaults].inventory: Context
    // resolution fails before any host is ever contacted.
    let td = tempdir().unwrap();
    netcfgbu_cmd()
        .current_dir(td.path())
        .arg("probe")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("inventory"));
}

#[test]
fn filtering_every_host_away_is_an_empty_inventory_error() {
    let inventory = write_inventory(SAMPLE_INVENTORY);
    netcfgbu_cmd()
        .arg("-i")
        .arg(inventory.path())
        .arg("-l")
        .arg("os_name=does-not-exist")
        .arg("probe")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn unparsable_ipaddr_filter_is_a_config_error() {
    let inventory = write_inventory(SAMPLE_INVENTORY);
    netcfgbu_cmd()
        .arg("-i")
        .arg(inventory.path())
        .arg("-l")
        .arg("ipaddr=not-an-address")
        .arg("probe")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("ipaddr"));
}

#[test]
fn vcs_status_reports_non_repository() {
    let configs_dir = tempdir().unwrap();
    let mut config = NamedTempFile::new().unwrap();
    writeln!(
        config,
        r#"
        [defaults]
        configs_dir = "{}"

        [git]
        repo_url = "https://git.example.com/org/netcfgbu-configs.git"
        user = "netcfgbu"
        email = "netcfgbu@example.com"
        "#,
        configs_dir.path().display()
    )
    .unwrap();

    netcfgbu_cmd()
        .arg("-C")
        .arg(config.path())
        .arg("vcs")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not a git repository"));
}

#[test]
fn vcs_status_reports_branch_after_prepare() {
    let configs_dir = tempdir().unwrap();
    fs::write(configs_dir.path().join("sw1.cfg"), "hostname sw1\n").unwrap();

    let mut config = NamedTempFile::new().unwrap();
    writeln!(
        config,
        r#"
        [defaults]
        configs_dir = "{}"

        [git]
        repo_url = "https://git.example.com/org/netcfgbu-configs.git"
        user = "netcfgbu"
        email = "netcfgbu@example.com"
        "#,
        configs_dir.path().display()
    )
    .unwrap();

    netcfgbu_cmd()
        .arg("-C")
        .arg(config.path())
        .arg("vcs")
        .arg("prepare")
        .assert()
        .success();

    netcfgbu_cmd()
        .arg("-C")
        .arg(config.path())
        .arg("vcs")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("branch="));
}

#[test]
fn inventory_build_runs_the_configured_script() {
    use std::os::unix::fs::PermissionsExt;

    let td = tempdir().unwrap();
    let script = td.path().join("build-inventory.sh");
    let target = td.path().join("generated.csv");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\nprintf 'host,os_name\\nsw1,eos\\n' > {}\n",
            target.display()
        ),
    )
    .unwrap();
    let mut perms = fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script, perms).unwrap();

    let mut config = NamedTempFile::new().unwrap();
    writeln!(
        config,
        r#"
        [inventory]
        script = "{}"
        "#,
        script.display()
    )
    .unwrap();

    netcfgbu_cmd()
        .arg("-C")
        .arg(config.path())
        .arg("inventory")
        .arg("build")
        .assert()
        .success();

    assert_eq!(fs::read_to_string(target).unwrap(), "host,os_name\nsw1,eos\n");
}

#[test]
fn unknown_linter_reference_in_config_is_rejected() {
    let inventory = write_inventory(SAMPLE_INVENTORY);
    let mut config = NamedTempFile::new().unwrap();
    writeln!(
        config,
        r#"
        [os_name.eos]
        linter = "missing"
        "#
    )
    .unwrap();

    netcfgbu_cmd()
        .arg("-C")
        .arg(config.path())
        .arg("-i")
        .arg(inventory.path())
        .arg("probe")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("missing"));
}
