//! Target execution.
//!
//! The [`Scheduler`] drives one run over a resolved order. A single controlling
//! task walks the order; parallel targets dispatch their direct dependencies on
//! a [`JoinSet`] and join them before their own body runs. Every target runs at
//! most once per run: each name owns a [`OnceCell`] and concurrent requests for
//! the same target wait on the same initialisation.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::graph::{GraphError, TargetGraph};
use super::types::{RunResult, SkipReason, TargetContext, TargetError, TargetKind, TargetName};
use crate::env::Environment;
use crate::exec::CommandExecutor;

/// Outcome of one target within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
  Succeeded,
  Failed,
  Skipped,
}

impl Outcome {
  fn is_success(self) -> bool {
    self == Outcome::Succeeded
  }
}

type OutcomeFuture = Pin<Box<dyn Future<Output = Outcome> + Send>>;

/// Executes targets from a frozen [`TargetGraph`].
pub struct Scheduler {
  graph: Arc<TargetGraph>,
  default_targets: Vec<TargetName>,
  executor: Arc<dyn CommandExecutor>,
  env: Environment,
  jobs: usize,
}

impl Scheduler {
  pub fn new(
    graph: Arc<TargetGraph>,
    default_targets: Vec<TargetName>,
    executor: Arc<dyn CommandExecutor>,
    env: Environment,
    jobs: usize,
  ) -> Self {
    Self {
      graph,
      default_targets,
      executor,
      env,
      jobs: jobs.max(1),
    }
  }

  /// Resolve `requested` (or the default targets when empty) into an order.
  pub fn resolve(&self, requested: &[TargetName]) -> Result<Vec<TargetName>, GraphError> {
    if requested.is_empty() {
      self.graph.resolve(&self.default_targets)
    } else {
      self.graph.resolve(requested)
    }
  }

  /// Resolve and run `requested` (or the default targets when empty).
  pub async fn run(&self, requested: &[TargetName]) -> Result<RunResult, GraphError> {
    let order = self.resolve(requested)?;
    Ok(self.run_order(order).await)
  }

  /// Execute a resolved order.
  ///
  /// Stops starting top-level work at the first failure. Parallel siblings
  /// that were already dispatched drain before this returns.
  pub async fn run_order(&self, order: Vec<TargetName>) -> RunResult {
    let started = Instant::now();
    info!(targets = order.len(), jobs = self.jobs, "starting run");

    let state = Arc::new(RunState {
      graph: self.graph.clone(),
      cells: order.iter().map(|name| (name.clone(), OnceCell::new())).collect(),
      executor: self.executor.clone(),
      env: self.env.clone(),
      semaphore: Arc::new(Semaphore::new(self.jobs)),
      log: Mutex::new(RunLog::default()),
    });

    let owned = self.graph.parallel_subtrees(&order);
    for name in &order {
      if owned.contains(name) {
        debug!(target = %name, "deferred to parallel dispatch");
        continue;
      }
      if !state.clone().ensure(name.clone()).await.is_success() {
        break;
      }
    }

    let mut result = state.finish(order);
    result.elapsed = started.elapsed();

    info!(
      succeeded = result.succeeded.len(),
      failed = result.failed.len(),
      skipped = result.skipped.len(),
      "run complete"
    );

    result
  }
}

#[derive(Default)]
struct RunLog {
  succeeded: Vec<TargetName>,
  failed: Vec<(TargetName, TargetError)>,
  skipped: Vec<(TargetName, SkipReason)>,
}

struct RunState {
  graph: Arc<TargetGraph>,
  cells: HashMap<TargetName, OnceCell<Outcome>>,
  executor: Arc<dyn CommandExecutor>,
  env: Environment,
  semaphore: Arc<Semaphore>,
  log: Mutex<RunLog>,
}

impl RunState {
  /// Run `name` unless it already ran (or is running) in this run.
  fn ensure(self: Arc<Self>, name: TargetName) -> OutcomeFuture {
    Box::pin(async move {
      let Some(cell) = self.cells.get(&name) else {
        // Resolution always covers the closure; reaching this is a graph bug.
        error!(target = %name, "target outside resolved order");
        return Outcome::Failed;
      };
      *cell.get_or_init(|| self.clone().execute(name.clone())).await
    })
  }

  async fn execute(self: Arc<Self>, name: TargetName) -> Outcome {
    let Some(target) = self.graph.get(&name).cloned() else {
      return Outcome::Failed;
    };

    let blocked_by = match target.kind {
      TargetKind::Sequential => {
        let mut blocked_by = None;
        for dep in &target.dependencies {
          if !self.clone().ensure(dep.clone()).await.is_success() {
            blocked_by = Some(dep.clone());
            break;
          }
        }
        blocked_by
      }
      TargetKind::Parallel => self.clone().dispatch(&name, &target.dependencies).await,
    };

    if let Some(dependency) = blocked_by {
      warn!(target = %name, failed_dep = %dependency, "skipping target due to failed dependency");
      self.record_skip(name, SkipReason::DependencyFailed { dependency });
      return Outcome::Skipped;
    }

    let Ok(_permit) = self.semaphore.acquire().await else {
      self.record_failure(name, TargetError::Aborted("job pool closed".to_string()));
      return Outcome::Failed;
    };

    info!(target = %name, "running target");
    let ctx = TargetContext {
      name: name.clone(),
      env: self.env.clone(),
      executor: self.executor.clone(),
    };

    match target.body.execute(&ctx).await {
      Ok(()) => {
        info!(target = %name, "target succeeded");
        self.lock_log().succeeded.push(name);
        Outcome::Succeeded
      }
      Err(e) => {
        error!(target = %name, error = %e, "target failed");
        self.record_failure(name, e);
        Outcome::Failed
      }
    }
  }

  /// Run every direct dependency concurrently and wait for all of them.
  ///
  /// Returns the first dependency, in declaration order, that did not succeed.
  async fn dispatch(self: Arc<Self>, parent: &TargetName, dependencies: &[TargetName]) -> Option<TargetName> {
    debug!(target = %parent, children = dependencies.len(), "dispatching parallel dependencies");

    let mut join_set = JoinSet::new();
    let mut spawned: HashMap<tokio::task::Id, TargetName> = HashMap::new();
    for dep in dependencies {
      let state = self.clone();
      let child = dep.clone();
      let handle = join_set.spawn(async move {
        let outcome = state.ensure(child.clone()).await;
        (child, outcome)
      });
      spawned.insert(handle.id(), dep.clone());
    }

    let mut outcomes: HashMap<TargetName, Outcome> = HashMap::new();
    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok((dep, outcome)) => {
          outcomes.insert(dep, outcome);
        }
        Err(e) => {
          let Some(dep) = spawned.get(&e.id()).cloned() else {
            error!(target = %parent, error = %e, "unknown parallel task failed");
            continue;
          };
          error!(target = %dep, parent = %parent, error = %e, "parallel task panicked");
          self.record_failure(dep.clone(), TargetError::Aborted(e.to_string()));
          outcomes.insert(dep, Outcome::Failed);
        }
      }
    }

    dependencies
      .iter()
      .find(|dep| !outcomes.get(*dep).is_some_and(|o| o.is_success()))
      .cloned()
  }

  fn lock_log(&self) -> std::sync::MutexGuard<'_, RunLog> {
    self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn record_failure(&self, name: TargetName, err: TargetError) {
    self.lock_log().failed.push((name, err));
  }

  fn record_skip(&self, name: TargetName, reason: SkipReason) {
    self.lock_log().skipped.push((name, reason));
  }

  /// Collect the log and classify every target that never started.
  fn finish(self: Arc<Self>, order: Vec<TargetName>) -> RunResult {
    let mut log = std::mem::take(&mut *self.lock_log());

    let first_failed = log.failed.first().map(|(name, _)| name.clone());
    let mut not_ok: HashSet<TargetName> = log
      .failed
      .iter()
      .map(|(n, _)| n.clone())
      .chain(log.skipped.iter().map(|(n, _)| n.clone()))
      .collect();

    for name in &order {
      let started = self.cells.get(name).is_some_and(|cell| cell.initialized());
      if started || not_ok.contains(name) {
        continue;
      }
      let dependency = self
        .graph
        .get(name)
        .and_then(|t| t.dependencies.iter().find(|d| not_ok.contains(*d)).cloned());
      let reason = match (dependency, &first_failed) {
        (Some(dependency), _) => SkipReason::DependencyFailed { dependency },
        (None, Some(failed)) => SkipReason::Aborted { failed: failed.clone() },
        (None, None) => SkipReason::Aborted { failed: name.clone() },
      };
      warn!(target = %name, reason = %reason, "target not started");
      not_ok.insert(name.clone());
      log.skipped.push((name.clone(), reason));
    }

    // Skips recorded during execution come first; keep the list in resolved order.
    let position: HashMap<&TargetName, usize> = order.iter().enumerate().map(|(i, n)| (n, i)).collect();
    log.skipped.sort_by_key(|(name, _)| position.get(name).copied().unwrap_or(usize::MAX));

    RunResult {
      order,
      succeeded: log.succeeded,
      failed: log.failed,
      skipped: log.skipped,
      elapsed: Default::default(),
    }
  }
}
