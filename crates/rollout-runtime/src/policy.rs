//! Which items are durable.
//!
//! Structural records are always kept. Response items and events are kept
//! only when they carry user-visible content or tool effects; streaming
//! deltas, lifecycle notifications and unknown sub-kinds are dropped.

use rollout_types::{EventMsg, ResponseItem, RolloutItem};

/// Whether an item should be written to the rollout log
pub fn should_persist(item: &RolloutItem) -> bool {
    match item {
        RolloutItem::SessionMeta(_) | RolloutItem::Compacted(_) | RolloutItem::TurnContext(_) => {
            true
        }
        RolloutItem::ResponseItem(item) => should_persist_response_item(item),
        RolloutItem::Event(ev) => should_persist_event(ev),
    }
}

pub fn should_persist_response_item(item: &ResponseItem) -> bool {
    match item {
        ResponseItem::Message { .. }
        | ResponseItem::Reasoning { .. }
        | ResponseItem::FunctionCall { .. }
        | ResponseItem::FunctionCallOutput { .. }
        | ResponseItem::CustomToolCall { .. }
        | ResponseItem::CustomToolCallOutput { .. }
        | ResponseItem::LocalShellCall { .. }
        | ResponseItem::WebSearchCall { .. } => true,
        ResponseItem::GhostSnapshot { .. } | ResponseItem::Other => false,
    }
}

pub fn should_persist_event(ev: &EventMsg) -> bool {
    match ev {
        EventMsg::UserMessage { .. }
        | EventMsg::AgentMessage { .. }
        | EventMsg::AgentReasoning { .. }
        | EventMsg::AgentReasoningRawContent { .. }
        | EventMsg::TokenCount { .. }
        | EventMsg::EnteredReviewMode { .. }
        | EventMsg::ExitedReviewMode { .. }
        | EventMsg::TurnAborted { .. } => true,
        EventMsg::AgentMessageDelta { .. }
        | EventMsg::AgentReasoningDelta { .. }
        | EventMsg::TaskStarted { .. }
        | EventMsg::TaskComplete { .. }
        | EventMsg::SessionConfigured { .. }
        | EventMsg::ExecCommandBegin { .. }
        | EventMsg::ExecCommandEnd { .. }
        | EventMsg::Other => false,
    }
}

/// Items from `items` that pass [`should_persist`], in order
pub fn filter_persisted(items: &[RolloutItem]) -> Vec<RolloutItem> {
    items.iter().filter(|item| should_persist(item)).cloned().collect()
}
