use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{SuiteResult, ValidateError};
use crate::env::Environment;
use crate::exec::CommandExecutor;

/// Consolidated report over every suite of a run.
#[async_trait]
pub trait ReportSink: Send + Sync {
  async fn write(&self, results: &[SuiteResult]) -> Result<(), ValidateError>;
}

/// Writes all results as one JSON document.
#[derive(Debug, Clone)]
pub struct JsonReport {
  path: PathBuf,
}

impl JsonReport {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

#[derive(Serialize)]
struct Report<'a> {
  passed: usize,
  failed: usize,
  suites: &'a [SuiteResult],
}

#[async_trait]
impl ReportSink for JsonReport {
  async fn write(&self, results: &[SuiteResult]) -> Result<(), ValidateError> {
    let passed = results.iter().filter(|r| r.passed).count();
    let report = Report {
      passed,
      failed: results.len() - passed,
      suites: results,
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|source| ValidateError::Report {
          path: parent.to_path_buf(),
          source,
        })?;
    }
    tokio::fs::write(&self.path, json)
      .await
      .map_err(|source| ValidateError::Report {
        path: self.path.clone(),
        source,
      })?;

    info!(path = %self.path.display(), suites = results.len(), "wrote validation report");
    Ok(())
  }
}

/// Delegates report generation to an external command, such as
/// `make junits`, once every suite is done.
pub struct CommandReport {
  executor: Arc<dyn CommandExecutor>,
  command: String,
  work_dir: PathBuf,
  env: Environment,
}

impl CommandReport {
  pub fn new(
    executor: Arc<dyn CommandExecutor>,
    command: impl Into<String>,
    work_dir: impl Into<PathBuf>,
    env: Environment,
  ) -> Self {
    Self {
      executor,
      command: command.into(),
      work_dir: work_dir.into(),
      env,
    }
  }
}

#[async_trait]
impl ReportSink for CommandReport {
  async fn write(&self, results: &[SuiteResult]) -> Result<(), ValidateError> {
    info!(command = %self.command, suites = results.len(), "generating validation report");
    self.executor.run(&self.command, &self.work_dir, &self.env).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;
  use crate::config::Configuration;
  use crate::util::testutil::RecordingExecutor;

  fn result(config: &str, passed: bool) -> SuiteResult {
    SuiteResult {
      configuration: Configuration::from(config),
      work_dir: PathBuf::from("/t"),
      passed,
      message: String::new(),
    }
  }

  #[tokio::test]
  async fn json_report_counts_results() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("reports/valid.json");
    let report = JsonReport::new(&path);

    report
      .write(&[result("a_sim", true), result("b_sim", false)])
      .await
      .unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["passed"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["suites"][1]["configuration"], "b_sim");
  }

  #[tokio::test]
  async fn command_report_runs_its_command() {
    let executor = Arc::new(RecordingExecutor::new());
    let report = CommandReport::new(executor.clone(), "make junits JUNIT_FILE=/r.xml", "/ws", Environment::new());

    report.write(&[result("a_sim", true)]).await.unwrap();

    assert_eq!(executor.commands(), vec!["make junits JUNIT_FILE=/r.xml"]);
  }
}
