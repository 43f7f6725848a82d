//! Target graph and execution.
//!
//! This module provides:
//! - Registration of named targets with duplicate detection
//! - Deterministic topological ordering of a requested closure
//! - Sequential and parallel execution with at-most-once semantics
//! - Failure propagation and skip tracking

pub mod body;
pub mod builder;
pub mod graph;
pub mod scheduler;
pub mod types;

pub use body::{CommandBody, Step};
pub use builder::Builder;
pub use graph::{GraphError, TargetGraph};
pub use scheduler::Scheduler;
pub use types::{
  NoopBody, RunResult, SkipReason, Target, TargetBody, TargetContext, TargetError, TargetKind, TargetName,
};
