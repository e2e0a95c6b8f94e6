//! Fixtures for rollout items and JSONL files.
//!
//! Builders cover the item shapes tests need most; `session_jsonl` renders
//! the export format so the same text can drive `import` and `record`.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use rollout_types::{
    EventMsg, ResponseItem, RolloutItem, RolloutLine, SessionId, SessionMeta, SessionMetaLine,
    format_timestamp,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed clock for deterministic fixture timestamps
pub fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 7, 17, 24, 21).unwrap()
}

pub fn user_message(text: &str) -> RolloutItem {
    EventMsg::user_message(text).into()
}

pub fn agent_message(text: &str) -> RolloutItem {
    EventMsg::agent_message(text).into()
}

pub fn assistant_message(text: &str) -> RolloutItem {
    ResponseItem::message("assistant", text).into()
}

pub fn function_call(name: &str, arguments: &str, call_id: &str) -> RolloutItem {
    RolloutItem::ResponseItem(ResponseItem::FunctionCall {
        name: name.to_string(),
        arguments: arguments.to_string(),
        call_id: call_id.to_string(),
    })
}

/// A streaming delta; dropped by the persistence policy
pub fn delta(text: &str) -> RolloutItem {
    RolloutItem::Event(EventMsg::AgentMessageDelta {
        delta: text.to_string(),
    })
}

/// Header for a session created at [`fixture_time`]
pub fn session_meta(id: SessionId) -> RolloutItem {
    RolloutItem::SessionMeta(SessionMetaLine {
        meta: SessionMeta {
            id,
            timestamp: format_timestamp(fixture_time()),
            cwd: PathBuf::from("/work/fixture"),
            originator: "fixture".to_string(),
            cli_version: "0.0.0".to_string(),
            instructions: None,
        },
        git: None,
    })
}

/// Export-format JSONL: header line followed by `items`
pub fn session_jsonl(id: SessionId, items: &[RolloutItem]) -> String {
    let mut out = String::new();
    for item in std::iter::once(session_meta(id)).chain(items.iter().cloned()) {
        let line = RolloutLine::new(fixture_time(), item);
        out.push_str(&serde_json::to_string(&line).expect("fixture line encodes"));
        out.push('\n');
    }
    out
}

/// Input for `rollout record`: one bare `RolloutItem` per line
pub fn items_jsonl(items: &[RolloutItem]) -> String {
    items
        .iter()
        .map(|item| serde_json::to_string(item).expect("fixture item encodes") + "\n")
        .collect()
}

/// Write `content` to `dir/name`, creating parent directories
pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path)
}
