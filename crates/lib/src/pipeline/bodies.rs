//! Build and validation bodies of the release targets.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::Pipeline;
use crate::config::Configuration;
use crate::consts::{PACKAGE_TEST_DIRS, PERF_FILES_DIR};
use crate::options::{BuildOptions, ReportFormat};
use crate::target::{CommandBody, Step, TargetBody, TargetContext, TargetError};
use crate::validate::{CommandReport, JsonReport, ReportSink, Suite};

/// Module listing against the integration branch, rendered to HTML.
pub(super) fn changelog(opts: &BuildOptions) -> CommandBody {
  let reference = if opts.integration_branch.is_empty() {
    "HEAD^".to_string()
  } else {
    format!("origin/{}", opts.integration_branch)
  };
  let listing = opts.artifacts_dir().join("ls_modules.html");

  CommandBody::new(vec![Step::new(
    format!(
      "./ls_modules.sh {reference} HEAD | ./ansi2html.sh > {}",
      listing.display()
    ),
    opts.odp_path(),
  )])
}

fn board_and_platform(config: &Configuration) -> Result<(&str, &str), TargetError> {
  let Some(board) = config.board() else {
    return Err(TargetError::Precondition(format!(
      "configuration {config} has no board component"
    )));
  };
  Ok((board, config.platform()))
}

/// `make valid` for every validation configuration, then the report.
pub(super) struct Valid {
  pipeline: Arc<Pipeline>,
}

impl Valid {
  pub(super) fn new(pipeline: Arc<Pipeline>) -> Self {
    Self { pipeline }
  }

  fn report(&self, ctx: &TargetContext) -> Option<Box<dyn ReportSink>> {
    let opts = &self.pipeline.options;
    let path = opts.report_path()?;
    match opts.report? {
      ReportFormat::Json => Some(Box::new(JsonReport::new(path))),
      ReportFormat::Junit => Some(Box::new(CommandReport::new(
        ctx.executor.clone(),
        format!(
          "make junits CONFIGS='{}' JUNIT_FILE={}",
          self.pipeline.configs.validate.joined(),
          path.display()
        ),
        opts.odp_path(),
        ctx.env.clone(),
      ))),
    }
  }
}

#[async_trait]
impl TargetBody for Valid {
  async fn execute(&self, ctx: &TargetContext) -> Result<(), TargetError> {
    let odp = self.pipeline.options.odp_path();
    ctx.run(&format!("mkdir -p {PERF_FILES_DIR}"), &odp).await?;

    let suites: Vec<Suite> = self
      .pipeline
      .configs
      .validate
      .iter()
      .map(|config| {
        Suite::command(
          config.clone(),
          format!("make valid CONFIGS='{config}'"),
          &odp,
          ctx.env.clone(),
        )
      })
      .collect();

    let report = self.report(ctx);
    self.pipeline.validation.run_all(&suites, report.as_deref()).await?;
    Ok(())
  }
}

/// Long-running tests from the installed tree, filtered by validation mode.
pub(super) struct Long {
  pipeline: Arc<Pipeline>,
}

impl Long {
  pub(super) fn new(pipeline: Arc<Pipeline>) -> Self {
    Self { pipeline }
  }

  fn long_root(&self) -> PathBuf {
    let opts = &self.pipeline.options;
    if opts.local_run {
      opts.odp_path().join("install/local/k1tools/share/odp/long")
    } else {
      opts.toolchain_dir.join("share/odp/long")
    }
  }
}

#[async_trait]
impl TargetBody for Long {
  async fn execute(&self, ctx: &TargetContext) -> Result<(), TargetError> {
    let opts = &self.pipeline.options;
    let mode = self.pipeline.configs.mode;
    let perf_files = opts.perf_files_dir().display().to_string();
    let root = self.long_root();

    let mut suites = Vec::new();
    for config in &self.pipeline.configs.validate {
      let (board, platform) = board_and_platform(config)?;
      let mut env = ctx.env.merged([
        ("test_name", format!("long-{config}")),
        ("perf_files_path", perf_files.clone()),
      ]);
      if opts.local_run {
        env = env.with("LOCAL_RUN", "1");
      }
      suites.push(Suite::ctest(
        config.clone(),
        root.join(board).join(platform),
        Some(mode.as_str()),
        env,
      ));
    }

    debug!(suites = suites.len(), %mode, "running long tests");
    self.pipeline.validation.run_all(&suites, None).await?;
    Ok(())
  }
}

/// Test trees shipped in the installed packages.
pub(super) struct ValidPackages {
  pipeline: Arc<Pipeline>,
}

impl ValidPackages {
  pub(super) fn new(pipeline: Arc<Pipeline>) -> Self {
    Self { pipeline }
  }
}

#[async_trait]
impl TargetBody for ValidPackages {
  async fn execute(&self, ctx: &TargetContext) -> Result<(), TargetError> {
    let root = self.pipeline.options.toolchain_dir.join("share/odp/tests");

    let mut suites = Vec::new();
    for config in &self.pipeline.configs.validate {
      let (board, platform) = board_and_platform(config)?;
      for dir in PACKAGE_TEST_DIRS {
        let env = ctx.env.with("test_name", format!("valid-{config}-{dir}"));
        suites.push(Suite::ctest(
          config.clone(),
          root.join(board).join(platform).join(dir),
          None,
          env,
        ));
      }
    }

    self.pipeline.validation.run_all(&suites, None).await?;
    Ok(())
  }
}

/// Archive performance results into the CI artifacts directory.
pub(super) struct ReportPerf {
  pipeline: Arc<Pipeline>,
}

impl ReportPerf {
  pub(super) fn new(pipeline: Arc<Pipeline>) -> Self {
    Self { pipeline }
  }
}

#[async_trait]
impl TargetBody for ReportPerf {
  async fn execute(&self, ctx: &TargetContext) -> Result<(), TargetError> {
    let opts = &self.pipeline.options;
    let Some(artifacts) = opts.artifacts.as_ref().filter(|a| !a.as_os_str().is_empty()) else {
      return Err(TargetError::Precondition("artifacts option not set".to_string()));
    };
    let artifacts = std::path::absolute(artifacts)?;

    let perf_files = opts.perf_files_dir();
    if !perf_files.exists() {
      info!(dir = %perf_files.display(), "no performance files to report");
      return Ok(());
    }

    ctx.run("tar -cvf perffiles.tar *.perf", &perf_files).await?;
    ctx
      .run(&format!("mv perffiles.tar {}", artifacts.display()), &perf_files)
      .await?;
    Ok(())
  }
}
