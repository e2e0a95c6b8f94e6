use super::HandlerContext;
use crate::presentation::{CommandResultViewModel, DeleteView};
use anyhow::Result;
use rollout_runtime::{RolloutRecorder, RolloutStore};

pub async fn handle(ctx: &HandlerContext, store: &RolloutStore, session_id: String) -> Result<()> {
    let deleted = RolloutRecorder::delete_session(store, &session_id).await?;
    ctx.render(CommandResultViewModel::new(DeleteView {
        session_id,
        deleted,
    }))
}
