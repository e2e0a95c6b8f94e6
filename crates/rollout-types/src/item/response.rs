use serde::{Deserialize, Serialize};

/// Model response fragment recorded in a rollout.
///
/// Unknown `type` tags decode to [`ResponseItem::Other`] so that newer
/// producers never break older readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseItem {
    /// 1. Conversation message (user, assistant, developer)
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        content: String,
    },

    /// 2. Reasoning summary emitted by the model
    Reasoning {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        summary: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// 3. Function tool invocation
    FunctionCall {
        name: String,
        arguments: String,
        call_id: String,
    },

    /// 4. Result of a function tool invocation
    FunctionCallOutput { call_id: String, output: String },

    /// 5. Free-form (custom) tool invocation
    CustomToolCall {
        name: String,
        input: String,
        call_id: String,
    },

    /// 6. Result of a custom tool invocation
    CustomToolCallOutput { call_id: String, output: String },

    /// 7. Shell command executed by the agent
    LocalShellCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        status: String,
        #[serde(default)]
        command: Vec<String>,
    },

    /// 8. Hosted web search
    WebSearchCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },

    /// Workspace snapshot taken for undo; internal bookkeeping
    GhostSnapshot { commit_id: String },

    #[serde(other)]
    Other,
}

impl ResponseItem {
    /// Convenience constructor for a plain message
    pub fn message(role: impl Into<String>, content: impl Into<String>) -> Self {
        ResponseItem::Message {
            role: Some(role.into()),
            content: content.into(),
        }
    }

    /// Wire tag of this variant
    pub fn type_name(&self) -> &'static str {
        match self {
            ResponseItem::Message { .. } => "message",
            ResponseItem::Reasoning { .. } => "reasoning",
            ResponseItem::FunctionCall { .. } => "function_call",
            ResponseItem::FunctionCallOutput { .. } => "function_call_output",
            ResponseItem::CustomToolCall { .. } => "custom_tool_call",
            ResponseItem::CustomToolCallOutput { .. } => "custom_tool_call_output",
            ResponseItem::LocalShellCall { .. } => "local_shell_call",
            ResponseItem::WebSearchCall { .. } => "web_search_call",
            ResponseItem::GhostSnapshot { .. } => "ghost_snapshot",
            ResponseItem::Other => "other",
        }
    }
}
