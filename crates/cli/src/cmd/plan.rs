//! Plan command implementation.
//!
//! Shows the resolved execution order and configuration sets without running
//! any target.

use anyhow::{Context, Result};
use serde::Serialize;

use shipyard_lib::config::ResolvedConfigs;
use shipyard_lib::target::TargetName;

use super::RunArgs;
use super::context::{RunContext, target_names};
use crate::output::{OutputFormat, format_order, print_info, print_json, print_stat};

#[derive(Serialize)]
struct PlanOutput<'a> {
  order: &'a [TargetName],
  configs: &'a ResolvedConfigs,
  jobs: usize,
}

pub fn cmd_plan(targets: &[String], args: &RunArgs, output: OutputFormat) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  rt.block_on(async {
    let ctx = RunContext::load(args).await?;
    let configs = ctx.resolve_configs()?;
    let builder = ctx.builder(configs.clone())?;
    let order = builder
      .resolve(&target_names(targets))
      .context("Failed to resolve targets")?;

    if output.is_json() {
      return print_json(&PlanOutput {
        order: &order,
        configs: &configs,
        jobs: builder.options().jobs,
      });
    }

    print_info(&format!("Plan: {}", format_order(&order)));
    print_stat("Build configs", &or_none(configs.build.joined()));
    print_stat("Validate configs", &or_none(configs.validate.joined()));
    print_stat("Mode", configs.mode.as_str());
    print_stat("Jobs", &builder.options().jobs.to_string());
    Ok(())
  })
}

fn or_none(list: String) -> String {
  if list.is_empty() { "(none)".to_string() } else { list }
}
