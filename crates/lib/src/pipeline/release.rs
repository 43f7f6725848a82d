//! Packaging bodies and the release parameters file.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::Pipeline;
use crate::consts::{DEFAULT_INSTALL_PREFIX, DKMS_INSTALL_PREFIX, PARAMETERS_FILE};
use crate::options::BuildOptions;
use crate::package::{DependencyConstraint, LifecycleScripts, PackageDescriptor, PackageKind, ReleaseInfo};
use crate::target::{TargetBody, TargetContext, TargetError};

const TARBALLS: [(&str, &str); 4] = [
  (
    "odp.tar",
    "local/k1tools/lib/ local/k1tools/share/odp/firmware local/k1tools/share/odp/build/ \
     local/k1tools/share/odp/skel/ local/k1tools/k1*/include local/k1tools/share/doc/ local/k1tools/lib64",
  ),
  (
    "odp-tests.tar",
    "local/k1tools/share/odp/tests local/k1tools/share/odp/long local/k1tools/share/odp/perf",
  ),
  ("odp-apps-internal.tar", "local/k1tools/share/odp/apps"),
  ("odp-cunit.tar", "local/k1tools/kalray_internal/cunit"),
];

/// Render `parameters.sh` for downstream CI jobs.
pub fn render_parameters(opts: &BuildOptions, release: &ReleaseInfo, long_revision: &str) -> String {
  let integration_branch = if opts.integration_branch.is_empty() {
    opts.branch.as_str()
  } else {
    opts.integration_branch.as_str()
  };

  [
    ("K1ODP_VERSION", release.full_version()),
    ("K1ODP_RELEASE", release.version.clone()),
    ("K1ODP_REVISION", long_revision.to_string()),
    ("COMMITER_EMAIL", opts.committer_email.clone()),
    ("INTEGRATION_BRANCH", integration_branch.to_string()),
    ("TMP_BRANCH", opts.target_branch.clone()),
    ("REVISION", long_revision.to_string()),
    ("INIC_BUILD_NUMBER", opts.build_number.clone()),
  ]
  .iter()
  .map(|(key, value)| format!("{key}={value}\n"))
  .collect()
}

/// Archive the install tree and create the four ODP packages.
pub(super) struct Package {
  pipeline: Arc<Pipeline>,
}

impl Package {
  pub(super) fn new(pipeline: Arc<Pipeline>) -> Self {
    Self { pipeline }
  }

  fn descriptor(&self, name: &str, summary: &str, release: &ReleaseInfo) -> PackageDescriptor {
    let revision = release.source_revision.as_deref().unwrap_or_default();
    PackageDescriptor::new(name, release.clone())
      .description(format!(
        "{summary} ({name}-{} sha1 {revision}).",
        release.full_version()
      ))
      .install_prefix(DEFAULT_INSTALL_PREFIX)
  }
}

#[async_trait]
impl TargetBody for Package {
  async fn execute(&self, ctx: &TargetContext) -> Result<(), TargetError> {
    let opts = &self.pipeline.options;
    let odp = opts.odp_path();

    for (tarball, contents) in TARBALLS {
      ctx.run(&format!("cd install/; tar cf ../{tarball} {contents}"), &odp).await?;
    }

    let release = self.pipeline.identity.describe().await?;
    let long_revision = self.pipeline.identity.long_revision().await?;
    let full_version = release.full_version();
    info!(version = %full_version, "packaging release");

    let mut odp_package = self
      .descriptor("k1-odp", "K1 ODP package", &release)
      .depends_on(DependencyConstraint::exact("k1-tools", &opts.k1_version));
    if !opts.libraries_version.is_empty() {
      odp_package = odp_package.depends_on(DependencyConstraint::exact("k1-libraries", &opts.libraries_version));
    }

    let packages = [
      ("odp.tar", odp_package),
      (
        "odp-tests.tar",
        self
          .descriptor("k1-odp-tests", "K1 ODP Standard Tests", &release)
          .depends_on(DependencyConstraint::exact("k1-odp", &full_version)),
      ),
      (
        "odp-apps-internal.tar",
        self
          .descriptor("k1-odp-apps-internal", "K1 ODP Internal Application and Demo", &release)
          .depends_on(DependencyConstraint::exact("k1-odp", &full_version)),
      ),
      (
        "odp-cunit.tar",
        // Pinned to itself, as released so far; the assembler flags it.
        self
          .descriptor("k1-odp-cunit", "K1 ODP CUnit", &release)
          .depends_on(DependencyConstraint::exact("k1-odp-cunit", &full_version)),
      ),
    ];

    for (tarball, descriptor) in packages {
      self.pipeline.assembler.assemble(&odp.join(tarball), descriptor).await?;
    }

    let parameters = opts.artifacts_dir().join(PARAMETERS_FILE);
    tokio::fs::write(&parameters, render_parameters(opts, &release, &long_revision)).await?;
    debug!(path = %parameters.display(), "wrote release parameters");
    Ok(())
  }
}

const SRC_DIR: &str = "mppapcie_odp-src";

const UNLOAD_SCRIPT: &str = r#"# Unload the mppapcie_odp module if it is loaded
MPPAPCIE_ODP_IS_LOADED=$(/bin/grep -c "^mppapcie_odp" /proc/modules)
if [ "${MPPAPCIE_ODP_IS_LOADED}" -gt 0 ]
then
	echo "mppapcie_odp module is loaded, unloading it"
	sudo /sbin/rmmod "mppapcie_odp"
	if [ $? -ne 0 ]
	then
		echo "[FAIL]"
		exit 1
	fi
	echo "[OK]"
fi
"#;

const FIRMWARE_PERMISSIONS: &str = "%attr(0755,root,root) /lib/firmware/\n%attr(0755,root,root)";

/// Source package of the PCIe driver, rebuilt on the host by DKMS.
pub(super) struct Dkms {
  pipeline: Arc<Pipeline>,
}

impl Dkms {
  pub(super) fn new(pipeline: Arc<Pipeline>) -> Self {
    Self { pipeline }
  }

  /// Version of the installed `k1-mppapcie-dkms` package, from the rpm or,
  /// failing that, the deb next to the toolchain.
  async fn mppapcie_version(&self, ctx: &TargetContext, dir: &Path) -> Result<String, TargetError> {
    let queries = [
      "rpm -qp --qf '%{VERSION}-%{RELEASE}' $K1_TOOLCHAIN_DIR/../../../k1-mppapcie-dkms-*.rpm",
      "dpkg-deb -f $K1_TOOLCHAIN_DIR/../../../k1-mppapcie-dkms-*.deb Version",
    ];
    for query in queries {
      match ctx.capture(query, dir).await {
        Ok(version) if !version.is_empty() => return Ok(version),
        Ok(_) => {}
        Err(e) => debug!(error = %e, "package version query failed"),
      }
    }
    Err(TargetError::Precondition(
      "could not extract mppapcie package version".to_string(),
    ))
  }
}

#[async_trait]
impl TargetBody for Dkms {
  async fn execute(&self, ctx: &TargetContext) -> Result<(), TargetError> {
    let odp = self.pipeline.options.odp_path();

    for command in [
      format!("mkdir -p {SRC_DIR}"),
      "cd mppapcie_odp && make clean".to_string(),
      format!("cp -rfL mppapcie_odp/* {SRC_DIR}/"),
      format!("mkdir -p {SRC_DIR}/package/lib/firmware"),
      format!("cd {SRC_DIR} && tar zcf ../{SRC_DIR}.tgz ./*"),
      format!("rm -rf {SRC_DIR}"),
    ] {
      ctx.run(&command, &odp).await?;
    }

    let pcie_version = self.mppapcie_version(ctx, &odp).await?;
    let described = self.pipeline.identity.describe().await?;
    let revision = described.source_revision.clone().unwrap_or_default();
    let release = described.without_revision();

    let descriptor = PackageDescriptor::new("k1-mppapcie-odp-dkms", release.clone())
      .description(format!(
        "MPPA Eth package (version:{} releaseID={} sha1:{revision})\n\
         This package contains Kalray's mppa ethernet driver module.",
        release.version, release.release_id
      ))
      .depends_on(DependencyConstraint::exact("k1-mppapcie-dkms", pcie_version))
      .install_prefix(DKMS_INSTALL_PREFIX)
      .scripts(LifecycleScripts {
        pre_install: UNLOAD_SCRIPT.to_string(),
        post_install: String::new(),
        pre_uninstall: UNLOAD_SCRIPT.to_string(),
        post_uninstall: String::new(),
      })
      .installed_file_permissions(FIRMWARE_PERMISSIONS)
      .kind(PackageKind::Dkms {
        modules: vec!["mppapcie_odp".to_string()],
      });

    self
      .pipeline
      .assembler
      .assemble(&odp.join(format!("{SRC_DIR}.tgz")), descriptor)
      .await?;
    Ok(())
  }
}
