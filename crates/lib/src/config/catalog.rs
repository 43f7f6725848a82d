use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ConfigError, ConfigSet, Configuration};
use crate::env::Environment;
use crate::exec::CommandExecutor;

/// The fixed set of configurations the product knows how to build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
  configs: ConfigSet,
}

impl Catalog {
  pub fn new<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      configs: names.into_iter().map(Configuration::new).collect(),
    }
  }

  /// Parse whitespace-separated catalog output.
  pub fn parse(listing: &str) -> Self {
    Self::new(listing.split_whitespace())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.configs.iter().any(|c| c.as_str() == name)
  }

  pub fn len(&self) -> usize {
    self.configs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.configs.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Configuration> {
    self.configs.iter()
  }

  /// Every configuration, in catalog order.
  pub fn all(&self) -> ConfigSet {
    self.configs.clone()
  }
}

/// Where the catalog comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
  async fn load(&self) -> Result<Catalog, ConfigError>;
}

/// Queries `make list-configs` in the product checkout.
pub struct MakeCatalog {
  executor: Arc<dyn CommandExecutor>,
  work_dir: PathBuf,
  env: Environment,
}

impl MakeCatalog {
  pub const COMMAND: &'static str = "make list-configs";

  pub fn new(executor: Arc<dyn CommandExecutor>, work_dir: impl Into<PathBuf>, env: Environment) -> Self {
    Self {
      executor,
      work_dir: work_dir.into(),
      env,
    }
  }
}

#[async_trait]
impl CatalogSource for MakeCatalog {
  async fn load(&self) -> Result<Catalog, ConfigError> {
    let listing = self.executor.capture(Self::COMMAND, &self.work_dir, &self.env).await?;
    let catalog = Catalog::parse(&listing);
    debug!(configs = catalog.len(), dir = %self.work_dir.display(), "loaded configuration catalog");
    Ok(catalog)
  }
}

#[async_trait]
impl CatalogSource for Catalog {
  async fn load(&self) -> Result<Catalog, ConfigError> {
    Ok(self.clone())
  }
}
