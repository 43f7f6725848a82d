//! Packager backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::assembler::Packager;
use super::types::{PackageError, PackageKind, PackageManifest};
use crate::env::Environment;
use crate::exec::CommandExecutor;
use crate::util::hash::{ContentHash, hash_file};

/// Writes `<name>-<full_version>.json` next to the other release artifacts.
#[derive(Debug, Clone)]
pub struct JsonPackager {
  output_dir: PathBuf,
}

#[derive(Serialize)]
struct PackageRecord<'a> {
  #[serde(flatten)]
  manifest: &'a PackageManifest,
  artifact: &'a Path,
  artifact_sha256: ContentHash,
}

impl JsonPackager {
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    Self {
      output_dir: output_dir.into(),
    }
  }

  pub fn path_for(&self, manifest: &PackageManifest) -> PathBuf {
    self
      .output_dir
      .join(format!("{}-{}.json", manifest.name, manifest.full_version))
  }
}

#[async_trait]
impl Packager for JsonPackager {
  async fn persist(&self, artifact: &Path, manifest: &PackageManifest) -> Result<PathBuf, PackageError> {
    if !artifact.is_file() {
      return Err(PackageError::ArtifactMissing(artifact.to_path_buf()));
    }
    let artifact_sha256 = hash_file(artifact).map_err(|source| PackageError::Io {
      path: artifact.to_path_buf(),
      source,
    })?;

    let record = PackageRecord {
      manifest,
      artifact,
      artifact_sha256,
    };
    let json = serde_json::to_string_pretty(&record)?;

    let path = self.path_for(manifest);
    tokio::fs::create_dir_all(&self.output_dir)
      .await
      .map_err(|source| PackageError::Io {
        path: self.output_dir.clone(),
        source,
      })?;
    tokio::fs::write(&path, json).await.map_err(|source| PackageError::Io {
      path: path.clone(),
      source,
    })?;

    debug!(path = %path.display(), sha256 = %record.artifact_sha256, "wrote package metadata");
    Ok(path)
  }
}

/// Runs an external packaging tool with the manifest exported as `PKG_*`
/// variables.
///
/// The tool may print the path of what it produced; otherwise the artifact
/// path is reported.
pub struct CommandPackager {
  executor: Arc<dyn CommandExecutor>,
  command: String,
  work_dir: PathBuf,
  env: Environment,
}

impl CommandPackager {
  pub fn new(
    executor: Arc<dyn CommandExecutor>,
    command: impl Into<String>,
    work_dir: impl Into<PathBuf>,
    env: Environment,
  ) -> Self {
    Self {
      executor,
      command: command.into(),
      work_dir: work_dir.into(),
      env,
    }
  }

  fn package_env(&self, artifact: &Path, manifest: &PackageManifest) -> Environment {
    let depends = manifest
      .dependencies
      .iter()
      .map(|d| d.to_string())
      .collect::<Vec<_>>()
      .join(", ");
    let (kind, modules) = match &manifest.kind {
      PackageKind::Standard => ("standard", String::new()),
      PackageKind::Dkms { modules } => ("dkms", modules.join(" ")),
    };

    self.env.merged([
      ("PKG_NAME", manifest.name.clone()),
      ("PKG_VERSION", manifest.version.clone()),
      ("PKG_RELEASE", manifest.release_id.clone()),
      ("PKG_FULL_VERSION", manifest.full_version.clone()),
      ("PKG_REVISION", manifest.source_revision.clone().unwrap_or_default()),
      ("PKG_DESCRIPTION", manifest.description.clone()),
      ("PKG_DEPENDS", depends),
      ("PKG_PREFIX", manifest.install_prefix.clone()),
      ("PKG_PREINST", manifest.scripts.pre_install.clone()),
      ("PKG_POSTINST", manifest.scripts.post_install.clone()),
      ("PKG_PREUN", manifest.scripts.pre_uninstall.clone()),
      ("PKG_POSTUN", manifest.scripts.post_uninstall.clone()),
      (
        "PKG_FILE_PERMISSIONS",
        manifest.installed_file_permissions.clone().unwrap_or_default(),
      ),
      ("PKG_KIND", kind.to_string()),
      ("PKG_DKMS_MODULES", modules),
      ("PKG_ARTIFACT", artifact.display().to_string()),
    ])
  }
}

#[async_trait]
impl Packager for CommandPackager {
  async fn persist(&self, artifact: &Path, manifest: &PackageManifest) -> Result<PathBuf, PackageError> {
    let env = self.package_env(artifact, manifest);
    let output = self.executor.capture(&self.command, &self.work_dir, &env).await?;

    match output.lines().last().map(str::trim) {
      Some(line) if !line.is_empty() => Ok(PathBuf::from(line)),
      _ => Ok(artifact.to_path_buf()),
    }
  }
}
