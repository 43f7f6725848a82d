//! The registry owner for one invocation.

use std::sync::Arc;

use tracing::debug;

use super::graph::{GraphError, TargetGraph};
use super::scheduler::Scheduler;
use super::types::{Target, TargetName};
use crate::env::Environment;
use crate::exec::CommandExecutor;
use crate::options::BuildOptions;

/// Collects targets, the default target set and the run options.
///
/// A `Builder` is mutable only while targets are registered; turning it into a
/// [`Scheduler`] freezes the registry.
#[derive(Debug)]
pub struct Builder {
  name: String,
  graph: TargetGraph,
  default_targets: Vec<TargetName>,
  options: BuildOptions,
}

impl Builder {
  pub fn new(name: impl Into<String>, options: BuildOptions) -> Self {
    Self {
      name: name.into(),
      graph: TargetGraph::new(),
      default_targets: Vec::new(),
      options,
    }
  }

  pub fn options(&self) -> &BuildOptions {
    &self.options
  }

  pub fn graph(&self) -> &TargetGraph {
    &self.graph
  }

  pub fn default_targets(&self) -> &[TargetName] {
    &self.default_targets
  }

  pub fn register(&mut self, target: Target) -> Result<(), GraphError> {
    debug!(builder = %self.name, target = %target.name, deps = target.dependencies.len(), "registering target");
    self.graph.register(target)
  }

  /// Set the targets run when none are requested.
  pub fn set_default_targets(&mut self, names: &[&str]) {
    self.default_targets = names.iter().map(|n| TargetName::from(*n)).collect();
  }

  /// Resolve `requested`, or the default targets when empty.
  pub fn resolve(&self, requested: &[TargetName]) -> Result<Vec<TargetName>, GraphError> {
    if requested.is_empty() {
      self.graph.resolve(&self.default_targets)
    } else {
      self.graph.resolve(requested)
    }
  }

  /// Freeze the registry and produce a scheduler.
  pub fn into_scheduler(self, executor: Arc<dyn CommandExecutor>, env: Environment) -> Scheduler {
    let jobs = self.options.jobs;
    Scheduler::new(Arc::new(self.graph), self.default_targets, executor, env, jobs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::RecordingExecutor;

  #[test]
  fn resolve_falls_back_to_default_targets() {
    let mut builder = Builder::new("odp", BuildOptions::default());
    builder.register(Target::new("changelog", &[])).unwrap();
    builder.register(Target::new("build", &["changelog"])).unwrap();
    builder.set_default_targets(&["build"]);
    assert_eq!(builder.default_targets(), &[TargetName::from("build")]);

    let order = builder.resolve(&[]).unwrap();

    assert_eq!(order, vec![TargetName::from("changelog"), TargetName::from("build")]);
  }

  #[test]
  fn duplicate_registration_is_rejected() {
    let mut builder = Builder::new("odp", BuildOptions::default());
    builder.register(Target::new("build", &[])).unwrap();

    assert!(matches!(
      builder.register(Target::new("build", &[])),
      Err(GraphError::DuplicateName(_))
    ));
    assert_eq!(builder.graph().len(), 1);
  }

  #[tokio::test]
  async fn scheduler_inherits_defaults() {
    let options = BuildOptions {
      jobs: 3,
      ..Default::default()
    };
    let mut builder = Builder::new("odp", options);
    assert_eq!(builder.options().jobs, 3);
    builder.register(Target::new("clean", &[])).unwrap();
    builder.set_default_targets(&["clean"]);

    let scheduler = builder.into_scheduler(Arc::new(RecordingExecutor::new()), Environment::new());
    let result = scheduler.run(&[]).await.unwrap();

    assert!(result.has_succeeded("clean"));
  }
}
