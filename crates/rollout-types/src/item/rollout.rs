use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::event::EventMsg;
use super::meta::{CompactedItem, SessionMetaLine, TurnContextItem};
use super::response::ResponseItem;
use crate::format_timestamp;

// NOTE: Wire Format
//
// One JSON object per line:
//   {"timestamp":"2025-05-07T17:24:21.123Z","type":"response-item","payload":{...}}
//
// - `type` is the ItemKind tag (kebab-case), `payload` the variant body
// - The same encoding is stored in the index `items.payload` column,
//   so export is a straight copy and import is a straight parse
// - Sub-kinds inside payloads use snake_case `type` tags

/// One recorded unit of a rollout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum RolloutItem {
    SessionMeta(SessionMetaLine),
    ResponseItem(ResponseItem),
    Compacted(CompactedItem),
    TurnContext(TurnContextItem),
    Event(EventMsg),
}

/// Discriminant of [`RolloutItem`], stored as the `kind` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    SessionMeta,
    ResponseItem,
    Compacted,
    TurnContext,
    Event,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::SessionMeta => "session-meta",
            ItemKind::ResponseItem => "response-item",
            ItemKind::Compacted => "compacted",
            ItemKind::TurnContext => "turn-context",
            ItemKind::Event => "event",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session-meta" => Ok(ItemKind::SessionMeta),
            "response-item" => Ok(ItemKind::ResponseItem),
            "compacted" => Ok(ItemKind::Compacted),
            "turn-context" => Ok(ItemKind::TurnContext),
            "event" => Ok(ItemKind::Event),
            other => Err(format!("unknown item kind: {}", other)),
        }
    }
}

impl RolloutItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            RolloutItem::SessionMeta(_) => ItemKind::SessionMeta,
            RolloutItem::ResponseItem(_) => ItemKind::ResponseItem,
            RolloutItem::Compacted(_) => ItemKind::Compacted,
            RolloutItem::TurnContext(_) => ItemKind::TurnContext,
            RolloutItem::Event(_) => ItemKind::Event,
        }
    }

    /// Whether this item makes a session worth listing.
    ///
    /// A session only shows up in listings once it carries a user or agent
    /// message; sessions that never progressed past creation stay hidden.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            RolloutItem::Event(EventMsg::UserMessage { .. })
                | RolloutItem::Event(EventMsg::AgentMessage { .. })
                | RolloutItem::ResponseItem(ResponseItem::Message { .. })
        )
    }

    /// Text of a user message, used as the session preview
    pub fn user_message_text(&self) -> Option<&str> {
        match self {
            RolloutItem::Event(EventMsg::UserMessage { message, .. }) => Some(message),
            RolloutItem::ResponseItem(ResponseItem::Message {
                role: Some(role),
                content,
            }) if role == "user" => Some(content),
            _ => None,
        }
    }

    /// Encode only the `payload` body (what the index stores per row)
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            RolloutItem::SessionMeta(v) => serde_json::to_string(v),
            RolloutItem::ResponseItem(v) => serde_json::to_string(v),
            RolloutItem::Compacted(v) => serde_json::to_string(v),
            RolloutItem::TurnContext(v) => serde_json::to_string(v),
            RolloutItem::Event(v) => serde_json::to_string(v),
        }
    }

    /// Decode a payload body stored under `kind`
    pub fn from_payload_json(kind: ItemKind, payload: &str) -> serde_json::Result<Self> {
        Ok(match kind {
            ItemKind::SessionMeta => RolloutItem::SessionMeta(serde_json::from_str(payload)?),
            ItemKind::ResponseItem => RolloutItem::ResponseItem(serde_json::from_str(payload)?),
            ItemKind::Compacted => RolloutItem::Compacted(serde_json::from_str(payload)?),
            ItemKind::TurnContext => RolloutItem::TurnContext(serde_json::from_str(payload)?),
            ItemKind::Event => RolloutItem::Event(serde_json::from_str(payload)?),
        })
    }
}

impl From<ResponseItem> for RolloutItem {
    fn from(item: ResponseItem) -> Self {
        RolloutItem::ResponseItem(item)
    }
}

impl From<EventMsg> for RolloutItem {
    fn from(ev: EventMsg) -> Self {
        RolloutItem::Event(ev)
    }
}

/// One line of an exported rollout file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutLine {
    pub timestamp: String,
    #[serde(flatten)]
    pub item: RolloutItem,
}

impl RolloutLine {
    pub fn new(timestamp: DateTime<Utc>, item: RolloutItem) -> Self {
        Self {
            timestamp: format_timestamp(timestamp),
            item,
        }
    }
}
