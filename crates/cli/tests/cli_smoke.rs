//! CLI smoke tests for shipyard.
//!
//! Every run uses `--catalog` so no `make list-configs` is needed, and only
//! targets that fail before or without a real build tree are executed.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

const CATALOG: &str = "k1b-kalray-nodeos_simu k1b-kalray-mos_simu k1b-kalray-nodeos_explorer k1b-kalray-mos_explorer";

/// A shipyard command isolated from CI variables of the calling environment.
fn shipyard_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("shipyard");
  for var in [
    "K1_TOOLCHAIN_DIR",
    "JOBS",
    "label",
    "INTEGRATION_BRANCH",
    "COMMITER_EMAIL",
    "BRANCH",
    "TARGET_BRANCH",
    "BUILD_NUMBER",
    "RUST_LOG",
  ] {
    cmd.env_remove(var);
  }
  cmd
}

fn in_workspace(cmd: &mut Command, workspace: &TempDir) {
  cmd
    .arg("--k1tools")
    .arg("/opt/k1tools")
    .arg("--workspace")
    .arg(workspace.path())
    .arg("--catalog")
    .arg(CATALOG);
}

#[test]
fn help_lists_subcommands() {
  shipyard_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"))
    .stdout(predicate::str::contains("run"))
    .stdout(predicate::str::contains("plan"))
    .stdout(predicate::str::contains("list-configs"));
}

#[test]
fn version_prints_package_version() {
  shipyard_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_subcommand_fails() {
  shipyard_cmd().arg("deploy").assert().failure();
}

#[test]
fn missing_toolchain_is_reported() {
  let workspace = TempDir::new().unwrap();

  shipyard_cmd()
    .args(["plan", "--catalog", CATALOG, "--workspace"])
    .arg(workspace.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("toolchain directory is not set"));
}

#[test]
fn missing_workspace_is_reported() {
  shipyard_cmd()
    .args([
      "plan",
      "--k1tools",
      "/opt/k1tools",
      "--catalog",
      CATALOG,
      "--workspace",
      "/nonexistent/shipyard-workspace",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("is not accessible"));
}

#[test]
fn plan_defaults_to_valid() {
  let workspace = TempDir::new().unwrap();
  let mut cmd = shipyard_cmd();
  cmd.arg("plan");
  in_workspace(&mut cmd, &workspace);

  cmd
    .assert()
    .success()
    .stdout(predicate::str::contains("changelog → build → install → valid"))
    .stdout(predicate::str::contains("k1b-kalray-mos_explorer"));
}

#[test]
fn plan_json_reports_label_selection() {
  let workspace = TempDir::new().unwrap();
  let mut cmd = shipyard_cmd();
  cmd.args(["--output", "json", "plan", "long", "--label", "MPPAExplorers_k1b-2", "--jobs", "2"]);
  in_workspace(&mut cmd, &workspace);

  let output = cmd.assert().success().get_output().stdout.clone();
  let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

  assert_eq!(json["order"], serde_json::json!(["long"]));
  assert_eq!(json["configs"]["mode"], "jtag");
  assert_eq!(
    json["configs"]["validate"],
    serde_json::json!(["k1b-kalray-nodeos_explorer", "k1b-kalray-mos_explorer"])
  );
  assert_eq!(json["jobs"], 2);
}

#[test]
fn plan_rejects_unsupported_label() {
  let workspace = TempDir::new().unwrap();
  let mut cmd = shipyard_cmd();
  cmd.args(["plan", "--label", "windows-xp"]);
  in_workspace(&mut cmd, &workspace);

  cmd
    .assert()
    .failure()
    .stderr(predicate::str::contains("unsupported label windows-xp!"));
}

#[test]
fn plan_rejects_configuration_outside_catalog() {
  let workspace = TempDir::new().unwrap();
  let mut cmd = shipyard_cmd();
  cmd.args(["plan", "--configs", "k1b-kalray-nodeos_konic80"]);
  in_workspace(&mut cmd, &workspace);

  cmd
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid config 'k1b-kalray-nodeos_konic80'"));
}

#[test]
fn plan_rejects_unknown_target() {
  let workspace = TempDir::new().unwrap();
  let mut cmd = shipyard_cmd();
  cmd.args(["plan", "deploy"]);
  in_workspace(&mut cmd, &workspace);

  cmd
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown target: deploy"));
}

#[test]
fn list_configs_prints_catalog() {
  let workspace = TempDir::new().unwrap();
  let mut cmd = shipyard_cmd();
  cmd.arg("list-configs");
  in_workspace(&mut cmd, &workspace);

  cmd
    .assert()
    .success()
    .stdout(predicate::str::contains("k1b-kalray-nodeos_simu\nk1b-kalray-mos_simu\n"));
}

#[test]
fn run_report_perf_without_artifacts_fails() {
  let workspace = TempDir::new().unwrap();
  let mut cmd = shipyard_cmd();
  cmd.args(["run", "report-perf"]);
  in_workspace(&mut cmd, &workspace);

  cmd
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Target 'report-perf' failed: artifacts option not set"));
}

#[test]
fn run_clean_without_makefile_fails() {
  let workspace = TempDir::new().unwrap();
  let mut cmd = shipyard_cmd();
  cmd.args(["run", "clean"]);
  in_workspace(&mut cmd, &workspace);

  cmd
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Target 'clean' failed"));
}
