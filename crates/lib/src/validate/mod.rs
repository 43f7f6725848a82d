//! Validation suites.
//!
//! A [`Suite`] is one test command for one configuration in one directory,
//! usually `ctest` filtered by the validation mode label. Suites of a run are
//! executed in order by [`ValidationRunner::run_all`]; a failing suite does not
//! stop the ones after it. When a [`ReportSink`] is given it runs once, after
//! every suite has finished, and sees all results.

mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Configuration;
use crate::env::Environment;
use crate::exec::{CommandExecutor, ExecError};

pub use report::{CommandReport, JsonReport, ReportSink};

#[derive(Debug, Error)]
pub enum ValidateError {
  #[error("validation failed for: {}", .failed.join(", "))]
  SuiteFailed { failed: Vec<String> },

  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error("failed to write report {path}: {source}")]
  Report {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to serialize report: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// One test invocation.
#[derive(Debug, Clone)]
pub struct Suite {
  pub configuration: Configuration,
  pub command: String,
  pub work_dir: PathBuf,
  pub env: Environment,
}

impl Suite {
  /// `ctest`, optionally restricted to tests labelled `tag_filter`.
  pub fn ctest(
    configuration: Configuration,
    work_dir: impl Into<PathBuf>,
    tag_filter: Option<&str>,
    env: Environment,
  ) -> Self {
    let command = match tag_filter {
      Some(tag) if !tag.is_empty() => format!("ctest -L {tag}"),
      _ => "ctest".to_string(),
    };
    Self {
      configuration,
      command,
      work_dir: work_dir.into(),
      env,
    }
  }

  /// An arbitrary test command.
  pub fn command(
    configuration: Configuration,
    command: impl Into<String>,
    work_dir: impl Into<PathBuf>,
    env: Environment,
  ) -> Self {
    Self {
      configuration,
      command: command.into(),
      work_dir: work_dir.into(),
      env,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteResult {
  pub configuration: Configuration,
  pub work_dir: PathBuf,
  pub passed: bool,
  pub message: String,
}

pub struct ValidationRunner {
  executor: Arc<dyn CommandExecutor>,
}

impl ValidationRunner {
  pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
    Self { executor }
  }

  /// Run `ctest` for `configuration` in `work_dir`.
  pub async fn run_suite(
    &self,
    configuration: &Configuration,
    work_dir: &Path,
    tag_filter: Option<&str>,
    env: &Environment,
  ) -> Result<SuiteResult, ValidateError> {
    let suite = Suite::ctest(configuration.clone(), work_dir, tag_filter, env.clone());
    self.run(&suite).await
  }

  /// Run one suite. A non-zero exit is a failed result, not an error.
  pub async fn run(&self, suite: &Suite) -> Result<SuiteResult, ValidateError> {
    let status = self.executor.execute(&suite.command, &suite.work_dir, &suite.env).await?;
    let passed = status.success();
    let message = if passed {
      format!("Successfully validated {}", suite.configuration)
    } else {
      format!(
        "Failed to validate {} (exit code {:?})",
        suite.configuration, status.code
      )
    };

    if passed {
      info!(config = %suite.configuration, dir = %suite.work_dir.display(), "{message}");
    } else {
      error!(config = %suite.configuration, dir = %suite.work_dir.display(), "{message}");
    }

    Ok(SuiteResult {
      configuration: suite.configuration.clone(),
      work_dir: suite.work_dir.clone(),
      passed,
      message,
    })
  }

  /// Run every suite in order, then the report step, then fail if any suite
  /// failed.
  pub async fn run_all(
    &self,
    suites: &[Suite],
    report: Option<&dyn ReportSink>,
  ) -> Result<Vec<SuiteResult>, ValidateError> {
    let mut results = Vec::with_capacity(suites.len());
    for suite in suites {
      results.push(self.run(suite).await?);
    }

    if let Some(report) = report {
      report.write(&results).await?;
    }

    let failed: Vec<String> = results
      .iter()
      .filter(|r| !r.passed)
      .map(|r| r.configuration.to_string())
      .collect();
    if failed.is_empty() {
      Ok(results)
    } else {
      Err(ValidateError::SuiteFailed { failed })
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use async_trait::async_trait;

  use super::*;
  use crate::util::testutil::RecordingExecutor;

  #[derive(Default)]
  struct CollectingReport {
    seen: Mutex<Vec<Vec<SuiteResult>>>,
  }

  #[async_trait]
  impl ReportSink for CollectingReport {
    async fn write(&self, results: &[SuiteResult]) -> Result<(), ValidateError> {
      self.seen.lock().unwrap().push(results.to_vec());
      Ok(())
    }
  }

  fn suites() -> Vec<Suite> {
    ["k1b-kalray-nodeos_simu", "k1b-kalray-mos_simu"]
      .iter()
      .map(|c| {
        Suite::ctest(
          Configuration::from(*c),
          format!("/k1/share/odp/long/simu/{c}"),
          Some("sim"),
          Environment::new(),
        )
      })
      .collect()
  }

  #[test]
  fn ctest_command_uses_label_filter() {
    let with = Suite::ctest("a_b".into(), "/t", Some("jtag"), Environment::new());
    let without = Suite::ctest("a_b".into(), "/t", None, Environment::new());

    assert_eq!(with.command, "ctest -L jtag");
    assert_eq!(without.command, "ctest");
  }

  #[tokio::test]
  async fn run_suite_reports_pass_and_fail() {
    let executor = Arc::new(RecordingExecutor::new().fail_on("ctest -L remote", 8));
    let runner = ValidationRunner::new(executor);
    let config = Configuration::from("k1b-kalray-mos_emb01");

    let ok = runner
      .run_suite(&config, Path::new("/t"), Some("sim"), &Environment::new())
      .await
      .unwrap();
    let bad = runner
      .run_suite(&config, Path::new("/t"), Some("remote"), &Environment::new())
      .await
      .unwrap();

    assert!(ok.passed);
    assert_eq!(ok.message, "Successfully validated k1b-kalray-mos_emb01");
    assert!(!bad.passed);
    assert!(bad.message.starts_with("Failed to validate k1b-kalray-mos_emb01"));
  }

  #[tokio::test]
  async fn report_runs_once_after_all_suites() {
    let executor = Arc::new(RecordingExecutor::new());
    let runner = ValidationRunner::new(executor);
    let report = CollectingReport::default();

    let results = runner.run_all(&suites(), Some(&report)).await.unwrap();

    assert_eq!(results.len(), 2);
    let seen = report.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], results);
  }

  #[tokio::test]
  async fn failing_suite_does_not_stop_the_rest() {
    let executor = Arc::new(RecordingExecutor::new().fail_on("ctest", 1));
    let runner = ValidationRunner::new(executor.clone());
    let report = CollectingReport::default();

    let err = runner.run_all(&suites(), Some(&report)).await.unwrap_err();

    assert_eq!(executor.commands().len(), 2);
    assert_eq!(report.seen.lock().unwrap()[0].len(), 2);
    match err {
      ValidateError::SuiteFailed { failed } => {
        assert_eq!(failed, vec!["k1b-kalray-nodeos_simu", "k1b-kalray-mos_simu"]);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn results_for_the_same_configuration_are_all_kept() {
    let executor = Arc::new(RecordingExecutor::new());
    let runner = ValidationRunner::new(executor);
    let config = Configuration::from("k1b-kalray-mos_simu");
    let suites: Vec<Suite> = ["platform/mppa/test", "test/performance"]
      .iter()
      .map(|dir| Suite::ctest(config.clone(), *dir, None, Environment::new()))
      .collect();

    let results = runner.run_all(&suites, None).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[1].work_dir, PathBuf::from("test/performance"));
  }
}
