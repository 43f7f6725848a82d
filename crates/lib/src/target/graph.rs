//! Target registry and dependency resolution.
//!
//! [`TargetGraph`] owns every registered [`Target`] in declaration order and
//! computes execution orders over the dependency closure of a requested set.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use super::types::{Target, TargetKind, TargetName};

/// Errors raised while registering or resolving targets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  /// A target with this name is already registered.
  #[error("duplicate target name: {0}")]
  DuplicateName(TargetName),

  /// A requested or depended-upon target is not registered.
  #[error("unknown target: {name}{}", .referenced_by.as_ref().map(|r| format!(" (required by {})", r)).unwrap_or_default())]
  UnknownTarget {
    name: TargetName,
    referenced_by: Option<TargetName>,
  },

  /// The dependency closure contains a cycle through these targets.
  #[error("dependency cycle detected: {}", format_cycle(.0))]
  CycleDetected(Vec<TargetName>),
}

fn format_cycle(names: &[TargetName]) -> String {
  names.iter().map(TargetName::as_str).collect::<Vec<_>>().join(" -> ")
}

/// All registered targets, in declaration order.
#[derive(Debug, Default, Clone)]
pub struct TargetGraph {
  targets: Vec<Target>,
  index: HashMap<TargetName, usize>,
}

impl TargetGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a target.
  ///
  /// Dependencies may name targets that are registered later; they are only
  /// checked by [`TargetGraph::resolve`]. On error the graph is unchanged.
  pub fn register(&mut self, target: Target) -> Result<(), GraphError> {
    if self.index.contains_key(&target.name) {
      return Err(GraphError::DuplicateName(target.name));
    }
    self.index.insert(target.name.clone(), self.targets.len());
    self.targets.push(target);
    Ok(())
  }

  pub fn get(&self, name: &TargetName) -> Option<&Target> {
    self.index.get(name).map(|&i| &self.targets[i])
  }

  pub fn contains(&self, name: &TargetName) -> bool {
    self.index.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }

  /// Compute the execution order for `requested` and its transitive dependencies.
  ///
  /// Every target appears after all of its dependencies. Among targets that
  /// are ready at the same time, the one declared first comes first.
  pub fn resolve(&self, requested: &[TargetName]) -> Result<Vec<TargetName>, GraphError> {
    let closure = self.closure(requested)?;

    // Nodes are added in declaration order, so node index order is declaration order.
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut nodes: HashMap<usize, NodeIndex> = HashMap::new();
    for &decl in &closure {
      nodes.insert(decl, graph.add_node(decl));
    }
    for &decl in &closure {
      for dep in &self.targets[decl].dependencies {
        let dep_decl = self.index[dep];
        // Edge from dependency to dependent
        graph.add_edge(nodes[&dep_decl], nodes[&decl], ());
      }
    }

    let mut in_degree: HashMap<NodeIndex, usize> = graph
      .node_indices()
      .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();
    let mut ready: BTreeSet<NodeIndex> = in_degree
      .iter()
      .filter(|&(_, &deg)| deg == 0)
      .map(|(&idx, _)| idx)
      .collect();

    let mut order = Vec::with_capacity(closure.len());
    while let Some(idx) = ready.pop_first() {
      order.push(self.targets[graph[idx]].name.clone());
      for dependent in graph.neighbors_directed(idx, Direction::Outgoing) {
        if let Some(deg) = in_degree.get_mut(&dependent) {
          *deg = deg.saturating_sub(1);
          if *deg == 0 {
            ready.insert(dependent);
          }
        }
      }
    }

    if order.len() != closure.len() {
      return Err(GraphError::CycleDetected(self.cycle_members(&graph)));
    }

    Ok(order)
  }

  /// Targets owned by a parallel dispatch within `order`.
  ///
  /// These are the transitive dependencies of every parallel target in the
  /// order; the scheduler starts them from the parallel target rather than
  /// from the top-level loop.
  pub fn parallel_subtrees(&self, order: &[TargetName]) -> HashSet<TargetName> {
    let mut owned = HashSet::new();
    let mut stack: Vec<&TargetName> = order
      .iter()
      .filter_map(|name| self.get(name))
      .filter(|t| t.kind == TargetKind::Parallel)
      .flat_map(|t| t.dependencies.iter())
      .collect();

    while let Some(name) = stack.pop() {
      if owned.insert(name.clone())
        && let Some(target) = self.get(name)
      {
        stack.extend(target.dependencies.iter());
      }
    }
    owned
  }

  /// Declaration indices of the dependency closure, sorted.
  fn closure(&self, requested: &[TargetName]) -> Result<Vec<usize>, GraphError> {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut stack: Vec<(&TargetName, Option<&TargetName>)> = requested.iter().rev().map(|n| (n, None)).collect();

    while let Some((name, referenced_by)) = stack.pop() {
      let Some(&decl) = self.index.get(name) else {
        return Err(GraphError::UnknownTarget {
          name: name.clone(),
          referenced_by: referenced_by.cloned(),
        });
      };
      if seen.insert(decl) {
        let target = &self.targets[decl];
        stack.extend(target.dependencies.iter().rev().map(|d| (d, Some(&target.name))));
      }
    }

    let mut closure: Vec<usize> = seen.into_iter().collect();
    closure.sort_unstable();
    Ok(closure)
  }

  /// Names of the targets involved in cycles, in declaration order.
  fn cycle_members(&self, graph: &DiGraph<usize, ()>) -> Vec<TargetName> {
    let mut members: Vec<usize> = tarjan_scc(graph)
      .into_iter()
      .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
      .flatten()
      .map(|idx| graph[idx])
      .collect();
    members.sort_unstable();
    members.into_iter().map(|decl| self.targets[decl].name.clone()).collect()
  }
}
