//! Custom assertions for rollout-specific validation.
//!
//! All helpers read the CLI's JSON envelope (`{"content": ...}`).

use anyhow::{Context, Result};
use serde_json::Value;

/// Conversation ids of a `list --format json` page, in output order.
pub fn conversation_ids(json: &Value) -> Result<Vec<String>> {
    let conversations = json["content"]["conversations"]
        .as_array()
        .context("Expected 'content.conversations' array in JSON")?;

    conversations
        .iter()
        .enumerate()
        .map(|(i, conv)| {
            conv["id"]
                .as_str()
                .map(str::to_string)
                .with_context(|| format!("Conversation {} missing id", i))
        })
        .collect()
}

/// Assert that a listing page holds the expected number of conversations.
pub fn assert_conversation_count(json: &Value, expected: usize) -> Result<()> {
    let ids = conversation_ids(json)?;
    if ids.len() != expected {
        anyhow::bail!("Expected {} conversations, got {}", expected, ids.len());
    }
    Ok(())
}

/// `next_cursor` of a listing page, if present.
pub fn next_cursor(json: &Value) -> Option<String> {
    json["content"]["next_cursor"].as_str().map(str::to_string)
}

/// Assert that `history --format json` shows sequences `0..n` with the
/// session-meta header first. Returns `n`.
pub fn assert_dense_history(json: &Value) -> Result<usize> {
    let items = json["content"]["items"]
        .as_array()
        .context("Expected 'content.items' array in JSON")?;

    for (expected, item) in items.iter().enumerate() {
        let sequence = item["sequence"]
            .as_u64()
            .with_context(|| format!("Item {} missing sequence", expected))?;
        if sequence != expected as u64 {
            anyhow::bail!("Item {} has sequence {}", expected, sequence);
        }
    }

    match items.first().and_then(|item| item["type"].as_str()) {
        Some("session-meta") => Ok(items.len()),
        other => anyhow::bail!("History starts with {:?} instead of session-meta", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dense_history() {
        let json = json!({"content": {"items": [
            {"sequence": 0, "type": "session-meta"},
            {"sequence": 1, "type": "event"},
        ]}});
        assert_eq!(assert_dense_history(&json).unwrap(), 2);

        let gap = json!({"content": {"items": [
            {"sequence": 0, "type": "session-meta"},
            {"sequence": 2, "type": "event"},
        ]}});
        assert!(assert_dense_history(&gap).is_err());
    }

    #[test]
    fn test_conversation_ids() {
        let json = json!({"content": {"conversations": [{"id": "a"}, {"id": "b"}]}});
        assert_eq!(conversation_ids(&json).unwrap(), vec!["a", "b"]);
        assert!(assert_conversation_count(&json, 3).is_err());
        assert_eq!(next_cursor(&json), None);
    }
}
