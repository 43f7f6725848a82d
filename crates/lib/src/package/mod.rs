//! Package assembly.
//!
//! A [`PackageDescriptor`] describes one distributable package: its
//! [`ReleaseInfo`], its ordered dependency constraints, install prefix and
//! lifecycle scripts. [`PackageAssembler`] validates a descriptor and hands it
//! to a [`Packager`] backend. Archiving the artifact itself is done by the
//! target body before assembly.

mod assembler;
mod packager;
pub mod types;

pub use assembler::{PackageAssembler, Packager};
pub use packager::{CommandPackager, JsonPackager};
pub use types::{
  ConstraintOp, DependencyConstraint, LifecycleScripts, PackageDescriptor, PackageError, PackageKind, PackageManifest,
  PersistedPackage, ReleaseInfo,
};
