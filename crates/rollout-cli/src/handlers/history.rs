use super::HandlerContext;
use crate::presentation::{CommandResultViewModel, HistoryView};
use anyhow::{Result, bail};
use rollout_runtime::{InitialHistory, RolloutRecorder, RolloutStore};

pub async fn handle(ctx: &HandlerContext, store: &RolloutStore, session_id: String) -> Result<()> {
    let history = match RolloutRecorder::get_history(store, &session_id).await? {
        InitialHistory::Resumed(resumed) => resumed.history,
        InitialHistory::New => bail!("Session not found: {}", session_id),
    };

    ctx.render(CommandResultViewModel::new(HistoryView::new(
        session_id, history,
    )))
}
