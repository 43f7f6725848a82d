mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::RunArgs;
use output::OutputFormat;

/// Build, validate and package the ODP release
#[derive(Parser)]
#[command(name = "shipyard")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run targets and their dependencies (default: valid)
  Run {
    targets: Vec<String>,

    #[command(flatten)]
    args: RunArgs,
  },

  /// Show the execution order and configurations without running anything
  Plan {
    targets: Vec<String>,

    #[command(flatten)]
    args: RunArgs,
  },

  /// List the configurations the checkout can build
  ListConfigs {
    #[command(flatten)]
    args: RunArgs,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Run { targets, args } => cmd::cmd_run(&targets, &args, cli.output),
    Commands::Plan { targets, args } => cmd::cmd_plan(&targets, &args, cli.output),
    Commands::ListConfigs { args } => cmd::cmd_list_configs(&args, cli.output),
  }
}
