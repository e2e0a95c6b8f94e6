use super::{HandlerContext, parse_ttl};
use crate::presentation::{CommandResultViewModel, RecordView};
use anyhow::{Context, Result};
use rollout_runtime::{CreateOptions, Error as RuntimeError, RolloutRecorder, RolloutStore};
use rollout_types::{RolloutItem, SessionId};
use std::io::BufRead;

/// Read one JSON `RolloutItem` per line and record them as a single batch.
///
/// With `--id` the session is resumed if it exists and created otherwise.
pub async fn handle<R: BufRead>(
    ctx: &HandlerContext,
    store: &RolloutStore,
    input: R,
    id: Option<String>,
    instructions: Option<String>,
    ttl_days: Option<String>,
) -> Result<()> {
    let ttl = parse_ttl(ttl_days.as_deref())?;

    let mut items = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item: RolloutItem = serde_json::from_str(&line)
            .with_context(|| format!("Invalid rollout item on line {}", index + 1))?;
        items.push(item);
    }

    let session_id = id.unwrap_or_else(|| SessionId::new().to_string());
    let (recorder, created) = match RolloutRecorder::resume(store, &session_id).await {
        Ok(recorder) => (recorder, false),
        Err(RuntimeError::NotFound(_)) => {
            let options = CreateOptions {
                instructions,
                ttl,
                ..Default::default()
            };
            (
                RolloutRecorder::create(store, &session_id, options).await?,
                true,
            )
        }
        Err(e) => return Err(e.into()),
    };

    let recorded = recorder.record_items(&items).await;
    recorder.shutdown().await?;
    recorded?;

    ctx.render(CommandResultViewModel::new(RecordView {
        session_id,
        received: items.len(),
        created,
    }))
}
