//! Option validation, catalog loading and pipeline wiring shared by commands.

use std::sync::Arc;

use anyhow::{Context, Result};

use shipyard_lib::config::{Catalog, CatalogSource, ConfigResolver, MakeCatalog, ResolvedConfigs};
use shipyard_lib::env::Environment;
use shipyard_lib::exec::{CommandExecutor, ShellExecutor};
use shipyard_lib::options::BuildOptions;
use shipyard_lib::pipeline::{Pipeline, standard_builder};
use shipyard_lib::target::{Builder, TargetName};

use super::RunArgs;

pub struct RunContext {
  pub options: BuildOptions,
  pub env: Environment,
  pub executor: Arc<dyn CommandExecutor>,
  pub catalog: Catalog,
}

impl RunContext {
  pub async fn load(args: &RunArgs) -> Result<Self> {
    let options = args.to_options().validate().context("Invalid options")?;
    let env = options.base_environment(&Environment::from_process());
    let executor: Arc<dyn CommandExecutor> = Arc::new(ShellExecutor::new());

    let catalog = match &args.catalog {
      Some(listing) => Catalog::parse(listing),
      None => MakeCatalog::new(executor.clone(), options.odp_path(), env.clone())
        .load()
        .await
        .context("Failed to query the configuration catalog")?,
    };

    Ok(Self {
      options,
      env,
      executor,
      catalog,
    })
  }

  pub fn resolve_configs(&self) -> Result<ResolvedConfigs> {
    let opts = &self.options;
    ConfigResolver::default()
      .resolve(
        &opts.label,
        opts.configs.as_deref(),
        opts.valid_configs.as_deref(),
        &self.catalog,
      )
      .context("Failed to resolve configurations")
  }

  pub fn builder(&self, configs: ResolvedConfigs) -> Result<Builder> {
    let pipeline = Pipeline::new(self.options.clone(), configs, self.executor.clone(), self.env.clone());
    standard_builder(Arc::new(pipeline)).context("Failed to register release targets")
  }
}

pub fn target_names(targets: &[String]) -> Vec<TargetName> {
  targets.iter().map(|t| TargetName::from(t.as_str())).collect()
}
