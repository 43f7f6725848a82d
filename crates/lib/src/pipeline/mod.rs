//! The standard release pipeline.
//!
//! [`standard_builder`] registers every release target with its dependencies
//! and body:
//!
//! ```text
//! clean          changelog      report-perf    long    dkms
//!                    |
//!                  build
//!                    |
//!                 install
//!                /   |   \
//!           valid  apps  long-build     valid-packages
//!                    \      |
//!                     package <- dkms
//! ```
//!
//! `valid` and `valid-packages` are parallel targets. Running nothing runs
//! `valid`.

mod bodies;
mod release;

use std::sync::Arc;

use crate::config::ResolvedConfigs;
use crate::consts::targets::{
  APPS, BUILD, CHANGELOG, CLEAN, DKMS, INSTALL, LONG, LONG_BUILD, PACKAGE, REPORT_PERF, VALID, VALID_PACKAGES,
};
use crate::env::Environment;
use crate::exec::CommandExecutor;
use crate::identity::{GitIdentity, IdentityProvider};
use crate::options::BuildOptions;
use crate::package::{CommandPackager, JsonPackager, PackageAssembler, Packager};
use crate::target::{Builder, CommandBody, GraphError, Step, Target};
use crate::validate::ValidationRunner;

pub use release::render_parameters;

/// Shared services of the release targets.
pub struct Pipeline {
  pub options: BuildOptions,
  pub configs: ResolvedConfigs,
  pub identity: Arc<dyn IdentityProvider>,
  pub assembler: PackageAssembler,
  pub validation: ValidationRunner,
  pub executor: Arc<dyn CommandExecutor>,
}

impl Pipeline {
  /// Wire the default services: `git` identity, the JSON packager (or the
  /// configured packaging command) and a validation runner, all reaching the
  /// system through `executor`.
  pub fn new(
    options: BuildOptions,
    configs: ResolvedConfigs,
    executor: Arc<dyn CommandExecutor>,
    env: Environment,
  ) -> Self {
    let odp_path = options.odp_path();
    let packager: Arc<dyn Packager> = match &options.packager {
      Some(command) => Arc::new(CommandPackager::new(executor.clone(), command, &odp_path, env.clone())),
      None => Arc::new(JsonPackager::new(options.artifacts_dir())),
    };

    Self {
      identity: Arc::new(GitIdentity::new(executor.clone(), odp_path, env)),
      assembler: PackageAssembler::new(packager),
      validation: ValidationRunner::new(executor.clone()),
      options,
      configs,
      executor,
    }
  }
}

/// Make sure the artifacts directory exists before any target writes to it.
pub fn prepare(options: &BuildOptions) -> std::io::Result<()> {
  std::fs::create_dir_all(options.artifacts_dir())
}

/// Register the release targets and set `valid` as the default.
pub fn standard_builder(pipeline: Arc<Pipeline>) -> Result<Builder, GraphError> {
  let opts = &pipeline.options;
  let odp = opts.odp_path();
  let build_configs = pipeline.configs.build.joined();

  let mut builder = Builder::new("odp", opts.clone());

  builder.register(Target::new(CLEAN, &[]).with_body(CommandBody::new(vec![Step::new("make clean", &odp)])))?;
  builder.register(Target::new(CHANGELOG, &[]).with_body(bodies::changelog(opts)))?;
  builder.register(Target::new(BUILD, &[CHANGELOG]).with_body(CommandBody::new(vec![Step::new(
    build_command(&build_configs, opts.debug),
    &odp,
  )])))?;
  builder.register(Target::new(INSTALL, &[BUILD]).with_body(CommandBody::new(vec![
    Step::new("rm -Rf install/", &odp),
    Step::new(format!("make install CONFIGS='{build_configs}'"), &odp),
  ])))?;
  builder.register(Target::new(REPORT_PERF, &[]).with_body(bodies::ReportPerf::new(pipeline.clone())))?;
  builder.register(Target::parallel(VALID, &[INSTALL]).with_body(bodies::Valid::new(pipeline.clone())))?;
  builder.register(Target::parallel(VALID_PACKAGES, &[]).with_body(bodies::ValidPackages::new(pipeline.clone())))?;
  builder.register(
    Target::new(LONG_BUILD, &[INSTALL]).with_body(CommandBody::new(vec![Step::new(
      format!("make long-install CONFIGS='{build_configs}' LONG_CONFIGS='{build_configs}'"),
      &odp,
    )])),
  )?;
  builder.register(Target::new(APPS, &[INSTALL]).with_body(CommandBody::new(vec![Step::new("make apps-install", &odp)])))?;
  builder.register(Target::new(LONG, &[]).with_body(bodies::Long::new(pipeline.clone())))?;
  builder.register(Target::new(DKMS, &[]).with_body(release::Dkms::new(pipeline.clone())))?;
  builder.register(
    Target::new(PACKAGE, &[INSTALL, APPS, LONG_BUILD, DKMS]).with_body(release::Package::new(pipeline.clone())),
  )?;

  builder.set_default_targets(&[VALID]);
  Ok(builder)
}

fn build_command(configs: &str, debug: bool) -> String {
  if debug {
    format!("make build CONFIGS='{configs}' DEBUG_FLAGS='--enable-debug'")
  } else {
    format!("make build CONFIGS='{configs}'")
  }
}
