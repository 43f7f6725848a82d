//! Typed run options.
//!
//! [`BuildOptions`] is filled once by the caller, checked with
//! [`BuildOptions::validate`], and read-only afterwards. Paths used by target
//! bodies (`odp_path`, `artifacts_dir`, ...) are derived from it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{PERF_FILES_DIR, UNKNOWN_VERSION};
use crate::env::Environment;

/// Consolidated validation report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
  /// One JSON document written in-process.
  Json,
  /// JUnit XML produced by `make junits`.
  Junit,
}

#[derive(Debug, Error)]
pub enum OptionsError {
  #[error("toolchain directory is not set (use --k1tools or K1_TOOLCHAIN_DIR)")]
  MissingToolchain,

  #[error("jobs must be at least 1")]
  InvalidJobs,

  #[error("workspace {path} is not accessible: {source}")]
  Workspace {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot resolve output directory {path}: {source}")]
  OutputDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
  /// Compiler prefix (`K1_TOOLCHAIN_DIR`).
  pub toolchain_dir: PathBuf,
  pub workspace: PathBuf,
  /// Checkout directory, relative to `workspace`.
  pub clone: PathBuf,
  pub jobs: usize,
  /// Artifacts path given by the CI server; required by `report-perf`.
  pub artifacts: Option<PathBuf>,
  /// Run long tests from the local install tree instead of the toolchain.
  pub local_run: bool,
  pub debug: bool,
  /// Build configurations; `None` means the whole catalog.
  pub configs: Option<Vec<String>>,
  /// Validation configurations; `None` means the whole catalog.
  pub valid_configs: Option<Vec<String>>,
  pub output_dir: Option<PathBuf>,
  /// `k1-tools` version the main package depends on.
  pub k1_version: String,
  /// `k1-libraries` version; no dependency is recorded when empty.
  pub libraries_version: String,
  /// CI execution label.
  pub label: String,
  pub integration_branch: String,
  pub report: Option<ReportFormat>,
  pub report_file: Option<PathBuf>,
  /// External packaging command; metadata is written as JSON when unset.
  pub packager: Option<String>,
  pub committer_email: String,
  pub branch: String,
  pub target_branch: String,
  pub build_number: String,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      toolchain_dir: PathBuf::new(),
      workspace: PathBuf::from("."),
      clone: PathBuf::from("."),
      jobs: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
      artifacts: None,
      local_run: false,
      debug: false,
      configs: None,
      valid_configs: None,
      output_dir: None,
      k1_version: UNKNOWN_VERSION.to_string(),
      libraries_version: String::new(),
      label: String::new(),
      integration_branch: String::new(),
      report: None,
      report_file: None,
      packager: None,
      committer_email: String::new(),
      branch: String::new(),
      target_branch: String::new(),
      build_number: String::new(),
    }
  }
}

impl BuildOptions {
  /// Check the options and normalize paths.
  ///
  /// The workspace must exist. The output directory is made absolute but
  /// need not exist yet.
  pub fn validate(mut self) -> Result<Self, OptionsError> {
    if self.toolchain_dir.as_os_str().is_empty() {
      return Err(OptionsError::MissingToolchain);
    }
    if self.jobs == 0 {
      return Err(OptionsError::InvalidJobs);
    }

    self.workspace = dunce::canonicalize(&self.workspace).map_err(|source| OptionsError::Workspace {
      path: self.workspace.clone(),
      source,
    })?;

    if let Some(dir) = &self.output_dir {
      let absolute = std::path::absolute(dir).map_err(|source| OptionsError::OutputDir {
        path: dir.clone(),
        source,
      })?;
      self.output_dir = Some(dunce::simplified(&absolute).to_path_buf());
    }

    Ok(self)
  }

  /// The product checkout.
  pub fn odp_path(&self) -> PathBuf {
    self.workspace.join(&self.clone)
  }

  /// Where packages, reports and listings are written.
  pub fn artifacts_dir(&self) -> PathBuf {
    match &self.output_dir {
      Some(dir) => dir.clone(),
      None => self.workspace.join("artifacts"),
    }
  }

  pub fn perf_files_dir(&self) -> PathBuf {
    self.odp_path().join(PERF_FILES_DIR)
  }

  /// Report destination, defaulting next to the other artifacts.
  pub fn report_path(&self) -> Option<PathBuf> {
    let format = self.report?;
    Some(match &self.report_file {
      Some(path) => path.clone(),
      None => match format {
        ReportFormat::Json => self.artifacts_dir().join("validation.json"),
        ReportFormat::Junit => self.artifacts_dir().join("automake-tests.xml"),
      },
    })
  }

  /// `process` with the toolchain exported and prepended to the search paths.
  pub fn base_environment(&self, process: &Environment) -> Environment {
    let tool = |sub: &str| path_str(&self.toolchain_dir.join(sub));

    process
      .with("K1_TOOLCHAIN_DIR", path_str(&self.toolchain_dir))
      .with_path_prefix("PATH", &tool("bin"))
      .with_path_prefix("LD_LIBRARY_PATH", &tool("lib64"))
      .with_path_prefix("LD_LIBRARY_PATH", &tool("lib"))
  }
}

fn path_str(path: &Path) -> String {
  path.display().to_string()
}

#[cfg(test)]
mod tests {
  use serial_test::serial;
  use tempfile::TempDir;

  use super::*;

  fn options(workspace: &Path) -> BuildOptions {
    BuildOptions {
      toolchain_dir: PathBuf::from("/opt/k1tools"),
      workspace: workspace.to_path_buf(),
      clone: PathBuf::from("odp"),
      jobs: 4,
      ..Default::default()
    }
  }

  #[test]
  fn defaults_match_the_ci_script() {
    let opts = BuildOptions::default();
    assert_eq!(opts.k1_version, "unknown");
    assert!(opts.jobs >= 1);
    assert!(opts.configs.is_none());
    assert!(!opts.local_run);
  }

  #[test]
  fn validate_rejects_missing_toolchain_and_zero_jobs() {
    let temp = TempDir::new().unwrap();

    let no_tool = BuildOptions {
      toolchain_dir: PathBuf::new(),
      ..options(temp.path())
    };
    assert!(matches!(no_tool.validate(), Err(OptionsError::MissingToolchain)));

    let no_jobs = BuildOptions {
      jobs: 0,
      ..options(temp.path())
    };
    assert!(matches!(no_jobs.validate(), Err(OptionsError::InvalidJobs)));
  }

  #[test]
  fn validate_requires_existing_workspace() {
    let temp = TempDir::new().unwrap();
    let missing = options(&temp.path().join("nope"));

    assert!(matches!(missing.validate(), Err(OptionsError::Workspace { .. })));
  }

  #[test]
  fn derived_paths() {
    let temp = TempDir::new().unwrap();
    let opts = options(temp.path()).validate().unwrap();
    let workspace = dunce::canonicalize(temp.path()).unwrap();

    assert_eq!(opts.odp_path(), workspace.join("odp"));
    assert_eq!(opts.artifacts_dir(), workspace.join("artifacts"));
    assert_eq!(opts.perf_files_dir(), workspace.join("odp/perf_files"));
    assert_eq!(opts.report_path(), None);
  }

  #[test]
  fn output_dir_overrides_artifacts_and_hosts_reports() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("rpms");
    let opts = BuildOptions {
      output_dir: Some(out.clone()),
      report: Some(ReportFormat::Junit),
      ..options(temp.path())
    }
    .validate()
    .unwrap();

    assert!(opts.artifacts_dir().is_absolute());
    assert!(opts.artifacts_dir().ends_with("rpms"));
    assert_eq!(opts.report_path(), Some(opts.artifacts_dir().join("automake-tests.xml")));
  }

  #[test]
  #[serial]
  fn base_environment_prefixes_toolchain_paths() {
    temp_env::with_vars(
      [("PATH", Some("/usr/bin")), ("LD_LIBRARY_PATH", None::<&str>)],
      || {
        let opts = options(Path::new("/ws"));
        let env = opts.base_environment(&Environment::from_process());

        assert_eq!(env.get("K1_TOOLCHAIN_DIR"), Some("/opt/k1tools"));
        assert_eq!(env.get("PATH"), Some("/opt/k1tools/bin:/usr/bin"));
        assert_eq!(
          env.get("LD_LIBRARY_PATH"),
          Some("/opt/k1tools/lib:/opt/k1tools/lib64")
        );
      },
    );
  }

  #[test]
  #[serial]
  fn base_environment_keeps_existing_library_path() {
    temp_env::with_var("LD_LIBRARY_PATH", Some("/usr/local/lib"), || {
      let env = options(Path::new("/ws")).base_environment(&Environment::from_process());
      assert_eq!(
        env.get("LD_LIBRARY_PATH"),
        Some("/opt/k1tools/lib:/opt/k1tools/lib64:/usr/local/lib")
      );
    });
  }

  #[test]
  fn options_round_trip_through_json() {
    let opts = BuildOptions {
      report: Some(ReportFormat::Json),
      ..options(Path::new("/ws"))
    };
    let json = serde_json::to_string(&opts).unwrap();
    assert!(json.contains("\"report\":\"json\""));

    let partial: BuildOptions = serde_json::from_str(r#"{"jobs": 2}"#).unwrap();
    assert_eq!(partial.jobs, 2);
    assert_eq!(partial.k1_version, "unknown");
  }
}
