//! External command execution.
//!
//! Every side effect of a target body goes through a [`CommandExecutor`]:
//! one command string, one working directory, one [`Environment`]. There is no
//! retry anywhere; a non-zero status surfaces as [`ExecError::CommandFailed`].

pub mod shell;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::env::Environment;

pub use shell::ShellExecutor;

/// Exit status of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
  /// Exit code, `None` when the process was terminated by a signal.
  pub code: Option<i32>,
}

impl ExitStatus {
  pub const SUCCESS: ExitStatus = ExitStatus { code: Some(0) };

  pub fn from_code(code: i32) -> Self {
    Self { code: Some(code) }
  }

  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

impl From<std::process::ExitStatus> for ExitStatus {
  fn from(status: std::process::ExitStatus) -> Self {
    Self { code: status.code() }
  }
}

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum ExecError {
  /// The process could not be spawned or awaited.
  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// The command ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CommandFailed { cmd: String, code: Option<i32> },
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
  /// Run `command` in `work_dir` with exactly the variables of `env`.
  async fn execute(&self, command: &str, work_dir: &Path, env: &Environment) -> Result<ExitStatus, ExecError>;

  /// Run `command` and return its trimmed standard output.
  ///
  /// A non-zero exit status is an error.
  async fn capture(&self, command: &str, work_dir: &Path, env: &Environment) -> Result<String, ExecError>;

  /// Run `command`, turning a non-zero exit status into [`ExecError::CommandFailed`].
  async fn run(&self, command: &str, work_dir: &Path, env: &Environment) -> Result<(), ExecError> {
    let status = self.execute(command, work_dir, env).await?;
    if status.success() {
      Ok(())
    } else {
      Err(ExecError::CommandFailed {
        cmd: command.to_string(),
        code: status.code,
      })
    }
  }
}
