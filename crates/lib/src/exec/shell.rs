//! Shell-backed command executor.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{CommandExecutor, ExecError, ExitStatus};
use crate::env::Environment;

/// Runs each command through a shell (`/bin/sh -c` on Unix).
///
/// The child's environment is cleared and replaced by the supplied
/// [`Environment`]. Output of [`CommandExecutor::execute`] is inherited from
/// the parent so build logs stream to the terminal.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
  shell: Option<String>,
}

impl ShellExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use a specific shell instead of the platform default.
  pub fn with_shell(shell: impl Into<String>) -> Self {
    Self {
      shell: Some(shell.into()),
    }
  }

  fn command(&self, cmd: &str, work_dir: &Path, env: &Environment) -> Command {
    let (shell_cmd, shell_args) = get_shell(self.shell.as_deref());

    let mut command = Command::new(&shell_cmd);
    command.args(&shell_args).arg(cmd).current_dir(work_dir).env_clear();
    for (key, value) in env.iter() {
      command.env(key, value);
    }

    debug!(shell = %shell_cmd, working_dir = ?work_dir, "spawning process");
    command
  }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
  async fn execute(&self, cmd: &str, work_dir: &Path, env: &Environment) -> Result<ExitStatus, ExecError> {
    info!(cmd = %cmd, "executing command");

    let status = self
      .command(cmd, work_dir, env)
      .stdin(Stdio::null())
      .status()
      .await
      .map_err(|source| ExecError::Spawn {
        cmd: cmd.to_string(),
        source,
      })?;

    Ok(status.into())
  }

  async fn capture(&self, cmd: &str, work_dir: &Path, env: &Environment) -> Result<String, ExecError> {
    debug!(cmd = %cmd, "capturing command output");

    let output = self
      .command(cmd, work_dir, env)
      .stdin(Stdio::null())
      .output()
      .await
      .map_err(|source| ExecError::Spawn {
        cmd: cmd.to_string(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      return Err(ExecError::CommandFailed {
        cmd: cmd.to_string(),
        code: output.status.code(),
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

/// Get the shell command and argument for the current platform.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), vec!["/C".to_string()])
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[tokio::test]
  async fn capture_returns_trimmed_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let executor = ShellExecutor::new();

    let out = executor
      .capture("echo '  hello  '", temp_dir.path(), &Environment::new())
      .await
      .unwrap();

    assert_eq!(out, "hello");
  }

  #[tokio::test]
  async fn child_sees_only_supplied_environment() {
    let temp_dir = TempDir::new().unwrap();
    let executor = ShellExecutor::new();
    let env = Environment::new().with("MY_VAR", "my_value");

    let out = executor
      .capture("echo \"$MY_VAR:${HOME:-unset}\"", temp_dir.path(), &env)
      .await
      .unwrap();

    assert_eq!(out, "my_value:unset");
  }

  #[tokio::test]
  async fn execute_reports_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let executor = ShellExecutor::new();

    let status = executor
      .execute("exit 3", temp_dir.path(), &Environment::new())
      .await
      .unwrap();

    assert_eq!(status, ExitStatus::from_code(3));
  }

  #[tokio::test]
  async fn execute_runs_in_work_dir() {
    let temp_dir = TempDir::new().unwrap();
    let executor = ShellExecutor::new();

    executor
      .run("/usr/bin/touch cwd_marker", temp_dir.path(), &Environment::new())
      .await
      .unwrap();

    assert!(temp_dir.path().join("cwd_marker").exists());
  }

  #[tokio::test]
  async fn capture_failure_is_command_failed() {
    let temp_dir = TempDir::new().unwrap();
    let executor = ShellExecutor::new();

    let result = executor.capture("exit 1", temp_dir.path(), &Environment::new()).await;

    assert!(matches!(result, Err(ExecError::CommandFailed { code: Some(1), .. })));
  }

  #[tokio::test]
  async fn explicit_shell_is_used() {
    let temp_dir = TempDir::new().unwrap();
    let executor = ShellExecutor::with_shell("sh");
    let env = Environment::new().with("PATH", "/usr/bin:/bin");

    let out = executor.capture("echo via-sh", temp_dir.path(), &env).await.unwrap();

    assert_eq!(out, "via-sh");
  }

  #[test]
  fn get_shell_default_and_override() {
    assert_eq!(get_shell(None), ("/bin/sh".to_string(), vec!["-c".to_string()]));
    assert_eq!(
      get_shell(Some("/usr/bin/bash")),
      ("/usr/bin/bash".to_string(), vec!["-c".to_string()])
    );
  }
}
