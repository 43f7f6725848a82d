//! Types for targets and target execution.
//!
//! A [`Target`] is a named unit of orchestration work: a list of dependency
//! names, a [`TargetKind`], and a [`TargetBody`]. This module also defines the
//! error and result types produced when running targets.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::env::Environment;
use crate::exec::{CommandExecutor, ExecError};
use crate::identity::IdentityError;
use crate::package::PackageError;
use crate::validate::ValidateError;

/// Unique name of a registered target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetName(pub String);

impl TargetName {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for TargetName {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for TargetName {
  fn from(name: &str) -> Self {
    TargetName(name.to_string())
  }
}

impl From<String> for TargetName {
  fn from(name: String) -> Self {
    TargetName(name)
  }
}

/// How a target treats its direct dependencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
  /// Dependencies run one after another, in declaration order.
  #[default]
  Sequential,
  /// Direct dependencies are dispatched concurrently; the target joins them.
  Parallel,
}

/// Errors raised by a target body.
#[derive(Debug, Error)]
pub enum TargetError {
  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error(transparent)]
  Validate(#[from] ValidateError),

  #[error(transparent)]
  Identity(#[from] IdentityError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// A body-specific precondition did not hold.
  #[error("{0}")]
  Precondition(String),

  /// The task running the target panicked or was cancelled.
  #[error("target task aborted: {0}")]
  Aborted(String),
}

/// Everything a body needs to do its work.
///
/// `env` is the snapshot this target runs with; bodies derive per-command
/// environments from it with [`Environment::merged`].
#[derive(Clone)]
pub struct TargetContext {
  pub name: TargetName,
  pub env: Environment,
  pub executor: Arc<dyn CommandExecutor>,
}

impl TargetContext {
  /// Run a command with the target's environment.
  pub async fn run(&self, command: &str, work_dir: &Path) -> Result<(), ExecError> {
    self.executor.run(command, work_dir, &self.env).await
  }

  /// Run a command with the target's environment plus `overrides`.
  pub async fn run_with(&self, command: &str, work_dir: &Path, overrides: &Environment) -> Result<(), ExecError> {
    let env = self.env.merged(overrides.iter());
    self.executor.run(command, work_dir, &env).await
  }

  /// Run a command and return its trimmed standard output.
  pub async fn capture(&self, command: &str, work_dir: &Path) -> Result<String, ExecError> {
    self.executor.capture(command, work_dir, &self.env).await
  }
}

/// The work performed by a target once all of its dependencies succeeded.
#[async_trait]
pub trait TargetBody: Send + Sync {
  async fn execute(&self, ctx: &TargetContext) -> Result<(), TargetError>;
}

/// A body that does nothing; used by pure aggregation targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBody;

#[async_trait]
impl TargetBody for NoopBody {
  async fn execute(&self, _ctx: &TargetContext) -> Result<(), TargetError> {
    Ok(())
  }
}

/// A registered unit of work.
#[derive(Clone)]
pub struct Target {
  pub name: TargetName,
  pub dependencies: Vec<TargetName>,
  pub kind: TargetKind,
  pub body: Arc<dyn TargetBody>,
}

impl Target {
  /// A sequential target with no body yet.
  pub fn new(name: impl Into<TargetName>, dependencies: &[&str]) -> Self {
    Self {
      name: name.into(),
      dependencies: dependencies.iter().map(|d| TargetName::from(*d)).collect(),
      kind: TargetKind::Sequential,
      body: Arc::new(NoopBody),
    }
  }

  /// A parallel target with no body yet.
  pub fn parallel(name: impl Into<TargetName>, dependencies: &[&str]) -> Self {
    Self {
      kind: TargetKind::Parallel,
      ..Self::new(name, dependencies)
    }
  }

  pub fn with_body(mut self, body: impl TargetBody + 'static) -> Self {
    self.body = Arc::new(body);
    self
  }
}

impl std::fmt::Debug for Target {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Target")
      .field("name", &self.name)
      .field("dependencies", &self.dependencies)
      .field("kind", &self.kind)
      .finish_non_exhaustive()
  }
}

/// Why a target did not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
  /// A direct dependency failed or was itself skipped.
  DependencyFailed { dependency: TargetName },
  /// The run stopped starting new work after `failed` failed.
  Aborted { failed: TargetName },
}

impl std::fmt::Display for SkipReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SkipReason::DependencyFailed { dependency } => write!(f, "dependency {} did not succeed", dependency),
      SkipReason::Aborted { failed } => write!(f, "run aborted after {} failed", failed),
    }
  }
}

/// Result of one scheduler run.
#[derive(Debug, Default)]
pub struct RunResult {
  /// The resolved execution order.
  pub order: Vec<TargetName>,

  /// Targets that succeeded, in completion order.
  pub succeeded: Vec<TargetName>,

  /// Failed targets in the order their failures were observed.
  ///
  /// More than one entry is possible when parallel siblings fail while
  /// draining; the first entry is the failure the run reports.
  pub failed: Vec<(TargetName, TargetError)>,

  /// Targets that never started, in resolved order.
  pub skipped: Vec<(TargetName, SkipReason)>,

  /// Wall-clock duration of the run.
  pub elapsed: Duration,
}

impl RunResult {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  /// The failure attributed to the run.
  pub fn first_failure(&self) -> Option<(&TargetName, &TargetError)> {
    self.failed.first().map(|(name, err)| (name, err))
  }

  pub fn total(&self) -> usize {
    self.succeeded.len() + self.failed.len() + self.skipped.len()
  }

  pub fn was_skipped(&self, name: &str) -> bool {
    self.skipped.iter().any(|(n, _)| n.as_str() == name)
  }

  pub fn has_succeeded(&self, name: &str) -> bool {
    self.succeeded.iter().any(|n| n.as_str() == name)
  }
}
