mod context;

pub mod cleanup;
pub mod delete;
pub mod export;
pub mod history;
pub mod import;
pub mod list;
pub mod record;

pub use context::HandlerContext;

use anyhow::Result;
use rollout_types::TtlConfig;

/// Parse a `--ttl-days` value (`30` or `permanent`)
pub(crate) fn parse_ttl(raw: Option<&str>) -> Result<Option<TtlConfig>> {
    Ok(raw.map(str::parse::<TtlConfig>).transpose()?)
}
