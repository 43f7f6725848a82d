//! Release identity from the source repository.
//!
//! Releases are tagged `release-<version>` (or `v<version>`); `git describe
//! --long --tags` then yields `release-1.2.3-7-gabc1234`, where `7` is the
//! number of commits since the tag and becomes the release id.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::env::Environment;
use crate::exec::{CommandExecutor, ExecError};
use crate::package::ReleaseInfo;

#[derive(Debug, Error)]
pub enum IdentityError {
  #[error("cannot parse release identity from '{0}'")]
  Unparseable(String),

  #[error(transparent)]
  Exec(#[from] ExecError),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
  /// Version, release id and abbreviated revision of the checkout.
  async fn describe(&self) -> Result<ReleaseInfo, IdentityError>;

  /// Full revision hash of the checkout.
  async fn long_revision(&self) -> Result<String, IdentityError>;
}

/// Reads identity with `git` through a [`CommandExecutor`].
pub struct GitIdentity {
  executor: Arc<dyn CommandExecutor>,
  repo: PathBuf,
  env: Environment,
}

impl GitIdentity {
  pub const DESCRIBE: &'static str = "git describe --long --tags";
  pub const REV_PARSE: &'static str = "git rev-parse HEAD";

  pub fn new(executor: Arc<dyn CommandExecutor>, repo: impl Into<PathBuf>, env: Environment) -> Self {
    Self {
      executor,
      repo: repo.into(),
      env,
    }
  }
}

#[async_trait]
impl IdentityProvider for GitIdentity {
  async fn describe(&self) -> Result<ReleaseInfo, IdentityError> {
    let output = self.executor.capture(Self::DESCRIBE, &self.repo, &self.env).await?;
    let info = parse_describe(&output)?;
    debug!(version = %info.version, release = %info.release_id, "described repository");
    Ok(info)
  }

  async fn long_revision(&self) -> Result<String, IdentityError> {
    let output = self.executor.capture(Self::REV_PARSE, &self.repo, &self.env).await?;
    let revision = output.trim();
    if revision.is_empty() {
      return Err(IdentityError::Unparseable(output));
    }
    Ok(revision.to_string())
  }
}

/// Parse `git describe --long --tags` output.
///
/// The tag prefix (`release-` or `v`) is optional. The abbreviated hash after
/// `-g` becomes the source revision.
pub fn parse_describe(output: &str) -> Result<ReleaseInfo, IdentityError> {
  let unparseable = || IdentityError::Unparseable(output.trim().to_string());
  let described = output.trim();

  let mut parts = described.rsplitn(3, '-');
  let (Some(hash), Some(count), Some(tag)) = (parts.next(), parts.next(), parts.next()) else {
    return Err(unparseable());
  };

  let Some(revision) = hash.strip_prefix('g').filter(|h| !h.is_empty()) else {
    return Err(unparseable());
  };
  if count.is_empty() || !count.chars().all(|c| c.is_ascii_digit()) {
    return Err(unparseable());
  }

  let version = tag
    .strip_prefix("release-")
    .or_else(|| tag.strip_prefix('v'))
    .unwrap_or(tag);
  if version.is_empty() {
    return Err(unparseable());
  }

  Ok(ReleaseInfo::new(version, count).with_revision(revision))
}
