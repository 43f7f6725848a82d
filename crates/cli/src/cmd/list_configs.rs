use anyhow::{Context, Result};

use super::RunArgs;
use super::context::RunContext;
use crate::output::{OutputFormat, print_info, print_json};

pub fn cmd_list_configs(args: &RunArgs, output: OutputFormat) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  rt.block_on(async {
    let ctx = RunContext::load(args).await?;
    let names: Vec<&str> = ctx.catalog.iter().map(|c| c.as_str()).collect();

    if output.is_json() {
      return print_json(&names);
    }

    if names.is_empty() {
      print_info("No configurations available");
    }
    for name in names {
      println!("{}", name);
    }
    Ok(())
  })
}
