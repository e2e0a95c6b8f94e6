use super::{HandlerContext, parse_ttl};
use crate::presentation::{CommandResultViewModel, Guidance, ImportView};
use anyhow::{Context, Result};
use rollout_runtime::{RolloutStore, import_session};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

pub async fn handle(
    ctx: &HandlerContext,
    store: &RolloutStore,
    path: PathBuf,
    ttl_days: Option<String>,
) -> Result<()> {
    let ttl = parse_ttl(ttl_days.as_deref())?;
    let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;

    let id = import_session(store, BufReader::new(file), ttl).await?;

    let result = CommandResultViewModel::new(ImportView {
        session_id: id.to_string(),
    })
    .with_suggestion(Guidance::new("Inspect it").with_command(format!("rollout history {}", id)));
    ctx.render(result)
}
