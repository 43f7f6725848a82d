mod args;
mod context;
mod list_configs;
mod plan;
mod run;

pub use args::RunArgs;
pub use list_configs::cmd_list_configs;
pub use plan::cmd_plan;
pub use run::cmd_run;
