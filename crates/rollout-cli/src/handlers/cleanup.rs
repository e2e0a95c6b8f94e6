use super::HandlerContext;
use crate::presentation::{CleanupView, CommandResultViewModel};
use anyhow::Result;
use chrono::Utc;
use rollout_runtime::{Reaper, RolloutStore};
use std::time::Duration;
use tracing::{info, warn};

/// One cleanup pass, or with `every` a reaper loop until Ctrl+C
pub async fn handle(ctx: &HandlerContext, store: &RolloutStore, every: Option<u64>) -> Result<()> {
    let Some(secs) = every else {
        let report = store.cleanup_expired_at(Utc::now()).await?;
        return ctx.render(CommandResultViewModel::new(CleanupView { report }));
    };

    let period = Duration::from_secs(secs.max(1));
    info!(period_secs = period.as_secs(), "Starting reaper");
    let handle = Reaper::spawn(store.clone(), period);

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
    }

    handle.stop().await;
    info!("Reaper stopped");
    Ok(())
}
