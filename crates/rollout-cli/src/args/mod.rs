// NOTE: Command Surface
//
// Flat subcommands: the CLI is an operator tool over one store, and each
// command maps onto exactly one runtime operation. `--data-dir`,
// `--format` and `--log-level` are global so they can follow any
// subcommand.

mod commands;
mod enums;

pub use commands::*;
pub use enums::*;

use clap::Parser;

#[derive(Parser)]
#[command(name = "rollout")]
#[command(about = "Inspect and maintain durable agent rollout logs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory (defaults to $ROLLOUT_HOME, then the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}
