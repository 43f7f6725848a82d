//! Command-sequence bodies.

use std::path::PathBuf;

use async_trait::async_trait;

use super::types::{TargetBody, TargetContext, TargetError};
use crate::env::Environment;

/// One command of a [`CommandBody`].
#[derive(Debug, Clone)]
pub struct Step {
  pub command: String,
  pub work_dir: PathBuf,
  pub env: Environment,
}

impl Step {
  pub fn new(command: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
    Self {
      command: command.into(),
      work_dir: work_dir.into(),
      env: Environment::new(),
    }
  }

  /// Variables merged over the target environment for this step only.
  pub fn with_env(mut self, env: Environment) -> Self {
    self.env = env;
    self
  }
}

/// A body that runs its steps in order and stops at the first failure.
#[derive(Debug, Clone, Default)]
pub struct CommandBody {
  steps: Vec<Step>,
}

impl CommandBody {
  pub fn new(steps: Vec<Step>) -> Self {
    Self { steps }
  }
}

#[async_trait]
impl TargetBody for CommandBody {
  async fn execute(&self, ctx: &TargetContext) -> Result<(), TargetError> {
    for step in &self.steps {
      ctx.run_with(&step.command, &step.work_dir, &step.env).await?;
    }
    Ok(())
  }
}
