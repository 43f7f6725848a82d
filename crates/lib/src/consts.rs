/// Target names of the standard release pipeline.
pub mod targets {
  pub const CLEAN: &str = "clean";
  pub const CHANGELOG: &str = "changelog";
  pub const BUILD: &str = "build";
  pub const INSTALL: &str = "install";
  pub const REPORT_PERF: &str = "report-perf";
  pub const VALID: &str = "valid";
  pub const VALID_PACKAGES: &str = "valid-packages";
  pub const LONG_BUILD: &str = "long-build";
  pub const APPS: &str = "apps";
  pub const LONG: &str = "long";
  pub const DKMS: &str = "dkms";
  pub const PACKAGE: &str = "package";
}

/// Default version string when no toolchain version is supplied.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Install prefix used by every standard package.
pub const DEFAULT_INSTALL_PREFIX: &str = "/usr";

/// Install prefix for kernel module (DKMS) packages.
pub const DKMS_INSTALL_PREFIX: &str = "/kernel/../extra";

/// Directory under the clone where performance results are collected.
pub const PERF_FILES_DIR: &str = "perf_files";

/// Name of the generated release parameters file.
pub const PARAMETERS_FILE: &str = "parameters.sh";

/// Validation directories run for every installed test package.
pub const PACKAGE_TEST_DIRS: [&str; 3] = ["platform/mppa/test", "test/performance", "helper/test"];
