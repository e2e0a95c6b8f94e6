//! Console output for CLI commands.
//!
//! Handlers build a view model holding raw data; the renderer either
//! serializes it (`--format json`, wrapped as `{"content": ...}`) or prints
//! its `Display` form followed by any suggestions.

mod renderer;
mod view_models;

pub use renderer::ConsoleRenderer;
pub use view_models::*;
