// NOTE: rollout CLI Rationale
//
// Why a thin CLI (no logic of its own)?
// - Every command is one runtime operation plus rendering
// - The same store code runs under the CLI and under embedding agents,
//   so the CLI doubles as an operator tool for inspecting live stores
//
// Why open the store per invocation?
// - SQLite (WAL) handles concurrent readers alongside a running agent
// - The per-session transactions keep a CLI `delete`/`cleanup` and an
//   agent's writer from interleaving; one of them fails cleanly

mod args;
mod commands;
mod handlers;
mod logging;
pub mod presentation;

pub use args::{Cli, Commands, LogLevel, OutputFormat};
pub use commands::run;
