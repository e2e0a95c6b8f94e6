use super::HandlerContext;
use crate::presentation::{CommandResultViewModel, ExportView};
use anyhow::{Context, Result};
use rollout_runtime::{RolloutStore, export_session};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Export to `output`, or stream raw JSONL to stdout when no path is given
pub async fn handle(
    ctx: &HandlerContext,
    store: &RolloutStore,
    session_id: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let Some(path) = output else {
        let stdout = std::io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        export_session(store, &session_id, &mut writer).await?;
        writer.flush()?;
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let lines = export_session(store, &session_id, BufWriter::new(file)).await?;

    ctx.render(CommandResultViewModel::new(ExportView {
        session_id,
        lines,
        path: path.display().to_string(),
    }))
}
