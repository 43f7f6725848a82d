//! Run command implementation.
//!
//! Resolves configurations, schedules the requested targets and prints what
//! succeeded, failed and was skipped. Exits non-zero when any target did not
//! succeed.

use anyhow::{Context, Result};
use serde::Serialize;

use shipyard_lib::pipeline;
use shipyard_lib::target::{RunResult, SkipReason, TargetName};

use super::RunArgs;
use super::context::{RunContext, target_names};
use crate::output::{OutputFormat, format_duration, print_error, print_info, print_json, print_success, print_warning};

#[derive(Serialize)]
struct RunSummary<'a> {
  success: bool,
  order: &'a [TargetName],
  succeeded: &'a [TargetName],
  failed: Vec<FailedTarget<'a>>,
  skipped: Vec<SkippedTarget<'a>>,
  elapsed_ms: u128,
}

#[derive(Serialize)]
struct FailedTarget<'a> {
  target: &'a TargetName,
  error: String,
}

#[derive(Serialize)]
struct SkippedTarget<'a> {
  target: &'a TargetName,
  #[serde(flatten)]
  reason: &'a SkipReason,
}

pub fn cmd_run(targets: &[String], args: &RunArgs, output: OutputFormat) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(run(targets, args))?;

  if output.is_json() {
    print_summary_json(&result)?;
  } else {
    print_summary(&result);
  }

  if !result.is_success() {
    std::process::exit(1);
  }
  Ok(())
}

async fn run(targets: &[String], args: &RunArgs) -> Result<RunResult> {
  let ctx = RunContext::load(args).await?;
  let configs = ctx.resolve_configs()?;

  pipeline::prepare(&ctx.options).with_context(|| {
    format!(
      "Failed to create artifacts directory {}",
      ctx.options.artifacts_dir().display()
    )
  })?;

  let scheduler = ctx
    .builder(configs)?
    .into_scheduler(ctx.executor.clone(), ctx.env.clone());
  scheduler
    .run(&target_names(targets))
    .await
    .context("Failed to resolve targets")
}

fn print_summary(result: &RunResult) {
  for name in &result.succeeded {
    print_success(name.as_str());
  }
  for (name, err) in &result.failed {
    print_error(&format!("Target '{}' failed: {}", name, err));
  }
  for (name, reason) in &result.skipped {
    print_warning(&format!("Skipped '{}': {}", name, reason));
  }

  let elapsed = format_duration(result.elapsed);
  if result.is_success() {
    print_info(&format!("{} target(s) completed in {}", result.succeeded.len(), elapsed));
  } else {
    print_error(&format!(
      "Run failed: {} succeeded, {} failed, {} skipped ({})",
      result.succeeded.len(),
      result.failed.len(),
      result.skipped.len(),
      elapsed
    ));
  }
}

fn print_summary_json(result: &RunResult) -> Result<()> {
  print_json(&RunSummary {
    success: result.is_success(),
    order: &result.order,
    succeeded: &result.succeeded,
    failed: result
      .failed
      .iter()
      .map(|(target, err)| FailedTarget {
        target,
        error: err.to_string(),
      })
      .collect(),
    skipped: result
      .skipped
      .iter()
      .map(|(target, reason)| SkippedTarget { target, reason })
      .collect(),
    elapsed_ms: result.elapsed.as_millis(),
  })
}
