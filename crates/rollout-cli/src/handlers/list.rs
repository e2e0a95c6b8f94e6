use super::HandlerContext;
use crate::presentation::{CommandResultViewModel, ConversationListView, Guidance};
use anyhow::Result;
use rollout_runtime::{RolloutRecorder, RolloutStore};

pub async fn handle(
    ctx: &HandlerContext,
    store: &RolloutStore,
    limit: usize,
    cursor: Option<String>,
) -> Result<()> {
    let page = RolloutRecorder::list_conversations(store, limit, cursor.as_deref()).await?;
    let view = ConversationListView::from(page);

    let next_page = view
        .next_cursor
        .as_ref()
        .map(|token| format!("rollout list --limit {} --cursor {}", limit, token));
    let cap_hit_empty = view.reached_cap && view.conversations.is_empty();

    let mut result = CommandResultViewModel::new(view);
    if cap_hit_empty {
        result = result.with_suggestion(Guidance::new(
            "Scan limit reached before a visible conversation was found; keep paging",
        ));
    }
    if let Some(command) = next_page {
        result = result.with_suggestion(Guidance::new("Next page").with_command(command));
    }

    ctx.render(result)
}
