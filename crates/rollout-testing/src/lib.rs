//! Testing infrastructure for rollout integration tests.
//!
//! - `TestWorld`: isolated data directory plus a configured `rollout` command
//! - `assertions`: checks over the CLI's JSON output
//! - `fixtures`: rollout item builders and JSONL files
//! - `process`: background process management for `cleanup --every`

pub mod assertions;
pub mod fixtures;
pub mod process;
pub mod world;

pub use world::{CliResult, TestWorld};
