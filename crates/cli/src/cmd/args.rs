//! Command-line options shared by every subcommand.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use shipyard_lib::options::{BuildOptions, ReportFormat};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportArg {
  Json,
  Junit,
}

impl From<ReportArg> for ReportFormat {
  fn from(arg: ReportArg) -> Self {
    match arg {
      ReportArg::Json => ReportFormat::Json,
      ReportArg::Junit => ReportFormat::Junit,
    }
  }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
  /// Toolchain installation directory
  #[arg(long = "k1tools", env = "K1_TOOLCHAIN_DIR")]
  pub toolchain_dir: Option<PathBuf>,

  /// Workspace containing the checkout
  #[arg(long, default_value = ".")]
  pub workspace: PathBuf,

  /// Checkout directory, relative to the workspace
  #[arg(long, default_value = ".")]
  pub clone: PathBuf,

  /// Maximum number of targets running at once
  #[arg(short, long, env = "JOBS")]
  pub jobs: Option<usize>,

  /// CI artifacts directory
  #[arg(long)]
  pub artifacts: Option<PathBuf>,

  /// Run long tests from the local install tree
  #[arg(long)]
  pub local_run: bool,

  /// Build with debug flags
  #[arg(long)]
  pub debug: bool,

  /// Space-separated build configurations (default: all)
  #[arg(long)]
  pub configs: Option<String>,

  /// Space-separated validation configurations (default: all)
  #[arg(long)]
  pub valid_configs: Option<String>,

  #[arg(long)]
  pub output_dir: Option<PathBuf>,

  /// k1-tools version the main package depends on
  #[arg(long = "k1version")]
  pub k1_version: Option<String>,

  /// k1-libraries version the main package depends on
  #[arg(long = "librariesversion", default_value_t)]
  pub libraries_version: String,

  /// CI execution label selecting configurations and test mode
  #[arg(long, env = "label", default_value_t)]
  pub label: String,

  #[arg(long, env = "INTEGRATION_BRANCH", default_value_t)]
  pub integration_branch: String,

  /// Consolidated validation report format
  #[arg(long, value_enum)]
  pub report: Option<ReportArg>,

  #[arg(long)]
  pub report_file: Option<PathBuf>,

  /// Packaging command (default: write JSON package metadata)
  #[arg(long)]
  pub packager: Option<String>,

  #[arg(long, env = "COMMITER_EMAIL", default_value_t)]
  pub committer_email: String,

  #[arg(long, env = "BRANCH", default_value_t)]
  pub branch: String,

  #[arg(long, env = "TARGET_BRANCH", default_value_t)]
  pub target_branch: String,

  #[arg(long, env = "BUILD_NUMBER", default_value_t)]
  pub build_number: String,

  /// Space-separated configuration catalog, instead of `make list-configs`
  #[arg(long)]
  pub catalog: Option<String>,
}

fn split_list(list: &Option<String>) -> Option<Vec<String>> {
  list
    .as_ref()
    .map(|l| l.split_whitespace().map(str::to_string).collect())
}

impl RunArgs {
  pub fn to_options(&self) -> BuildOptions {
    let defaults = BuildOptions::default();
    BuildOptions {
      toolchain_dir: self.toolchain_dir.clone().unwrap_or_default(),
      workspace: self.workspace.clone(),
      clone: self.clone.clone(),
      jobs: self.jobs.unwrap_or(defaults.jobs),
      artifacts: self.artifacts.clone(),
      local_run: self.local_run,
      debug: self.debug,
      configs: split_list(&self.configs),
      valid_configs: split_list(&self.valid_configs),
      output_dir: self.output_dir.clone(),
      k1_version: self.k1_version.clone().unwrap_or(defaults.k1_version),
      libraries_version: self.libraries_version.clone(),
      label: self.label.clone(),
      integration_branch: self.integration_branch.clone(),
      report: self.report.map(Into::into),
      report_file: self.report_file.clone(),
      packager: self.packager.clone(),
      committer_email: self.committer_email.clone(),
      branch: self.branch.clone(),
      target_branch: self.target_branch.clone(),
      build_number: self.build_number.clone(),
    }
  }
}
