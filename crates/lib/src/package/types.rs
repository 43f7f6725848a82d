//! Release and package metadata.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exec::ExecError;

/// Version identity of one release, computed once from the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
  pub version: String,
  pub release_id: String,
  /// Commit the release was built from. Not every package records it.
  pub source_revision: Option<String>,
}

impl ReleaseInfo {
  pub fn new(version: impl Into<String>, release_id: impl Into<String>) -> Self {
    Self {
      version: version.into(),
      release_id: release_id.into(),
      source_revision: None,
    }
  }

  pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
    self.source_revision = Some(revision.into());
    self
  }

  /// Drop the source revision, for packages that do not carry one.
  pub fn without_revision(&self) -> Self {
    Self {
      source_revision: None,
      ..self.clone()
    }
  }

  /// `version-release_id`.
  pub fn full_version(&self) -> String {
    format!("{}-{}", self.version, self.release_id)
  }
}

/// Comparison operator of a [`DependencyConstraint`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOp {
  #[default]
  #[serde(rename = "=")]
  Eq,
}

impl std::fmt::Display for ConstraintOp {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ConstraintOp::Eq => f.write_str("="),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConstraint {
  pub package_name: String,
  pub operator: ConstraintOp,
  pub version: String,
}

impl DependencyConstraint {
  /// `package_name = version`.
  pub fn exact(package_name: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      package_name: package_name.into(),
      operator: ConstraintOp::Eq,
      version: version.into(),
    }
  }
}

impl std::fmt::Display for DependencyConstraint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {} {}", self.package_name, self.operator, self.version)
  }
}

/// Scripts run by the package manager around install and removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleScripts {
  pub pre_install: String,
  pub post_install: String,
  pub pre_uninstall: String,
  pub post_uninstall: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PackageKind {
  /// A binary package installed under its prefix.
  #[default]
  Standard,
  /// Kernel module sources rebuilt on the target by DKMS.
  Dkms { modules: Vec<String> },
}

/// Everything needed to persist one package.
///
/// Built per package and moved into
/// [`PackageAssembler::assemble`](super::PackageAssembler::assemble).
#[derive(Debug, Clone, Default)]
pub struct PackageDescriptor {
  pub name: String,
  pub release_info: Option<ReleaseInfo>,
  pub description: String,
  pub dependencies: Vec<DependencyConstraint>,
  pub install_prefix: String,
  pub scripts: LifecycleScripts,
  pub installed_file_permissions: Option<String>,
  pub kind: PackageKind,
}

impl PackageDescriptor {
  pub fn new(name: impl Into<String>, release_info: ReleaseInfo) -> Self {
    Self {
      name: name.into(),
      release_info: Some(release_info),
      ..Default::default()
    }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn depends_on(mut self, dependency: DependencyConstraint) -> Self {
    self.dependencies.push(dependency);
    self
  }

  pub fn install_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.install_prefix = prefix.into();
    self
  }

  pub fn scripts(mut self, scripts: LifecycleScripts) -> Self {
    self.scripts = scripts;
    self
  }

  pub fn installed_file_permissions(mut self, permissions: impl Into<String>) -> Self {
    self.installed_file_permissions = Some(permissions.into());
    self
  }

  pub fn kind(mut self, kind: PackageKind) -> Self {
    self.kind = kind;
    self
  }
}

/// A validated descriptor, as handed to a [`Packager`](super::Packager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
  pub name: String,
  pub version: String,
  pub release_id: String,
  pub full_version: String,
  pub source_revision: Option<String>,
  pub description: String,
  pub dependencies: Vec<DependencyConstraint>,
  pub install_prefix: String,
  pub scripts: LifecycleScripts,
  pub installed_file_permissions: Option<String>,
  pub kind: PackageKind,
}

/// Result of a successful [`assemble`](super::PackageAssembler::assemble).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedPackage {
  pub name: String,
  pub full_version: String,
  pub dependencies: Vec<DependencyConstraint>,
  /// Where the packager put its output.
  pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("incomplete package descriptor: {field} is missing")]
  IncompleteDescriptor { field: &'static str },

  #[error("artifact not found: {0}")]
  ArtifactMissing(PathBuf),

  #[error("failed to write {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to serialize package metadata: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error(transparent)]
  Exec(#[from] ExecError),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_version_joins_with_dash() {
    let info = ReleaseInfo::new("1.2.3", "7").with_revision("abc1234");
    assert_eq!(info.full_version(), "1.2.3-7");
    assert_eq!(info.without_revision().source_revision, None);
  }

  #[test]
  fn constraint_displays_like_a_package_manager() {
    let dep = DependencyConstraint::exact("k1-odp", "1.2.3-7");
    assert_eq!(dep.to_string(), "k1-odp = 1.2.3-7");
  }

  #[test]
  fn constraint_operator_serializes_as_symbol() {
    let dep = DependencyConstraint::exact("k1-tools", "4.0");
    let json = serde_json::to_value(&dep).unwrap();
    assert_eq!(json["operator"], "=");
  }

  #[test]
  fn dkms_kind_carries_modules() {
    let kind = PackageKind::Dkms {
      modules: vec!["mppapcie_odp".into()],
    };
    let json = serde_json::to_value(&kind).unwrap();
    assert_eq!(json["type"], "dkms");
    assert_eq!(json["modules"][0], "mppapcie_odp");
  }
}
