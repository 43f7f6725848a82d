//! Test utilities for shipyard-lib.
//!
//! [`RecordingExecutor`] stands in for the shell: it records every invocation
//! and answers from canned rules, so scheduler and pipeline tests never spawn
//! processes.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::env::Environment;
use crate::exec::{CommandExecutor, ExecError, ExitStatus};

#[derive(Debug, Clone)]
pub struct Invocation {
  pub command: String,
  pub work_dir: PathBuf,
  pub env: Environment,
}

#[derive(Default)]
pub struct RecordingExecutor {
  invocations: Mutex<Vec<Invocation>>,
  failures: Vec<(String, i32)>,
  outputs: Vec<(String, String)>,
  delay: Option<Duration>,
  running: AtomicUsize,
  peak: AtomicUsize,
}

impl RecordingExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Commands starting with `prefix` exit with `code`.
  pub fn fail_on(mut self, prefix: &str, code: i32) -> Self {
    self.failures.push((prefix.to_string(), code));
    self
  }

  /// Captured commands starting with `prefix` print `output`.
  pub fn output_for(mut self, prefix: &str, output: &str) -> Self {
    self.outputs.push((prefix.to_string(), output.to_string()));
    self
  }

  /// Every command sleeps for `delay` before completing.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn invocations(&self) -> Vec<Invocation> {
    self.invocations.lock().unwrap().clone()
  }

  pub fn commands(&self) -> Vec<String> {
    self.invocations().into_iter().map(|i| i.command).collect()
  }

  /// Highest number of commands observed running at the same time.
  pub fn peak_concurrency(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }

  /// Index of the first recorded command starting with `prefix`.
  pub fn position(&self, prefix: &str) -> Option<usize> {
    self.commands().iter().position(|c| c.starts_with(prefix))
  }

  async fn record(&self, command: &str, work_dir: &Path, env: &Environment) {
    self.invocations.lock().unwrap().push(Invocation {
      command: command.to_string(),
      work_dir: work_dir.to_path_buf(),
      env: env.clone(),
    });

    let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self.running.fetch_sub(1, Ordering::SeqCst);
  }

  fn status_for(&self, command: &str) -> ExitStatus {
    self
      .failures
      .iter()
      .find(|(prefix, _)| command.starts_with(prefix.as_str()))
      .map(|(_, code)| ExitStatus::from_code(*code))
      .unwrap_or(ExitStatus::SUCCESS)
  }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
  async fn execute(&self, command: &str, work_dir: &Path, env: &Environment) -> Result<ExitStatus, ExecError> {
    self.record(command, work_dir, env).await;
    Ok(self.status_for(command))
  }

  async fn capture(&self, command: &str, work_dir: &Path, env: &Environment) -> Result<String, ExecError> {
    self.record(command, work_dir, env).await;
    let status = self.status_for(command);
    if !status.success() {
      return Err(ExecError::CommandFailed {
        cmd: command.to_string(),
        code: status.code,
      });
    }
    Ok(
      self
        .outputs
        .iter()
        .find(|(prefix, _)| command.starts_with(prefix.as_str()))
        .map(|(_, out)| out.clone())
        .unwrap_or_default(),
    )
  }
}
