//! shipyard-lib: release and validation orchestration.
//!
//! This crate provides the pieces a release run is made of:
//! - `target`: named targets, dependency resolution and the scheduler
//! - `config`: configuration catalog and CI label rules
//! - `package`: release metadata and package assembly
//! - `validate`: test suites and consolidated reports
//! - `pipeline`: the standard release targets wired together

pub mod config;
pub mod consts;
pub mod env;
pub mod exec;
pub mod identity;
pub mod options;
pub mod package;
pub mod pipeline;
pub mod target;
pub mod util;
pub mod validate;
