use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{info, warn};

use super::types::{PackageDescriptor, PackageError, PackageManifest, PersistedPackage};

/// Persists a package from an artifact and its validated metadata.
#[async_trait]
pub trait Packager: Send + Sync {
  /// Returns where the package ended up.
  async fn persist(&self, artifact: &Path, manifest: &PackageManifest) -> Result<PathBuf, PackageError>;
}

/// Validates descriptors and hands them to a [`Packager`].
///
/// The assembler remembers every package it produced during the run so that
/// dependencies pinned to this release can be checked against them.
pub struct PackageAssembler {
  packager: Arc<dyn Packager>,
  produced: Mutex<Vec<(String, String)>>,
}

impl PackageAssembler {
  pub fn new(packager: Arc<dyn Packager>) -> Self {
    Self {
      packager,
      produced: Mutex::new(Vec::new()),
    }
  }

  /// Packages produced so far, as `(name, full_version)`.
  pub fn produced(&self) -> Vec<(String, String)> {
    self.lock_produced().clone()
  }

  /// Validate `descriptor` and persist it exactly once.
  pub async fn assemble(&self, artifact: &Path, descriptor: PackageDescriptor) -> Result<PersistedPackage, PackageError> {
    let manifest = self.validate(descriptor)?;
    self.flag_dependencies(&manifest);

    let path = self.packager.persist(artifact, &manifest).await?;
    info!(package = %manifest.name, version = %manifest.full_version, path = %path.display(), "package created");

    self
      .lock_produced()
      .push((manifest.name.clone(), manifest.full_version.clone()));

    Ok(PersistedPackage {
      name: manifest.name,
      full_version: manifest.full_version,
      dependencies: manifest.dependencies,
      path,
    })
  }

  fn validate(&self, descriptor: PackageDescriptor) -> Result<PackageManifest, PackageError> {
    if descriptor.name.is_empty() {
      return Err(PackageError::IncompleteDescriptor { field: "name" });
    }
    if descriptor.install_prefix.is_empty() {
      return Err(PackageError::IncompleteDescriptor { field: "install_prefix" });
    }
    let Some(release) = descriptor.release_info else {
      return Err(PackageError::IncompleteDescriptor { field: "version" });
    };
    if release.version.is_empty() {
      return Err(PackageError::IncompleteDescriptor { field: "version" });
    }
    if release.release_id.is_empty() {
      return Err(PackageError::IncompleteDescriptor { field: "release_id" });
    }

    Ok(PackageManifest {
      full_version: release.full_version(),
      name: descriptor.name,
      version: release.version,
      release_id: release.release_id,
      source_revision: release.source_revision,
      description: descriptor.description,
      dependencies: descriptor.dependencies,
      install_prefix: descriptor.install_prefix,
      scripts: descriptor.scripts,
      installed_file_permissions: descriptor.installed_file_permissions,
      kind: descriptor.kind,
    })
  }

  /// Warn about suspicious dependency lists. Nothing is corrected.
  fn flag_dependencies(&self, manifest: &PackageManifest) {
    let produced = self.lock_produced();
    let mut seen = HashSet::new();

    for dep in &manifest.dependencies {
      if !seen.insert(dep.package_name.as_str()) {
        warn!(package = %manifest.name, dependency = %dep.package_name, "duplicate dependency");
      }

      if dep.package_name == manifest.name {
        warn!(package = %manifest.name, dependency = %dep, "package depends on itself");
        continue;
      }

      let pinned_to_release = dep.version == manifest.full_version;
      let was_produced = produced
        .iter()
        .any(|(name, version)| name == &dep.package_name && version == &dep.version);
      if pinned_to_release && !was_produced {
        warn!(
          package = %manifest.name,
          dependency = %dep,
          "dependency on this release was not produced earlier in the run"
        );
      }
    }
  }

  fn lock_produced(&self) -> MutexGuard<'_, Vec<(String, String)>> {
    self.produced.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
