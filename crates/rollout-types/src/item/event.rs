use serde::{Deserialize, Serialize};

/// Runtime event emitted by the agent loop.
///
/// Only a subset is durable (see the runtime persistence policy); streaming
/// deltas and lifecycle notifications are recorded here so that producers
/// can hand every event to the recorder without pre-filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventMsg {
    UserMessage {
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        images: Vec<String>,
    },

    AgentMessage {
        message: String,
    },

    AgentReasoning {
        text: String,
    },

    AgentReasoningRawContent {
        text: String,
    },

    /// Token accounting snapshot
    TokenCount {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        info: Option<TokenUsageInfo>,
    },

    EnteredReviewMode {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },

    ExitedReviewMode {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        review_output: Option<String>,
    },

    TurnAborted {
        reason: String,
    },

    // Ephemeral below this line
    AgentMessageDelta {
        delta: String,
    },

    AgentReasoningDelta {
        delta: String,
    },

    TaskStarted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_context_window: Option<u64>,
    },

    TaskComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_agent_message: Option<String>,
    },

    SessionConfigured {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },

    ExecCommandBegin {
        call_id: String,
        #[serde(default)]
        command: Vec<String>,
    },

    ExecCommandEnd {
        call_id: String,
        #[serde(default)]
        exit_code: i32,
    },

    #[serde(other)]
    Other,
}

/// Cumulative token usage reported by the model provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsageInfo {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub cached_input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub reasoning_output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl EventMsg {
    pub fn user_message(message: impl Into<String>) -> Self {
        EventMsg::UserMessage {
            message: message.into(),
            images: Vec::new(),
        }
    }

    pub fn agent_message(message: impl Into<String>) -> Self {
        EventMsg::AgentMessage {
            message: message.into(),
        }
    }

    /// Wire tag of this variant
    pub fn type_name(&self) -> &'static str {
        match self {
            EventMsg::UserMessage { .. } => "user_message",
            EventMsg::AgentMessage { .. } => "agent_message",
            EventMsg::AgentReasoning { .. } => "agent_reasoning",
            EventMsg::AgentReasoningRawContent { .. } => "agent_reasoning_raw_content",
            EventMsg::TokenCount { .. } => "token_count",
            EventMsg::EnteredReviewMode { .. } => "entered_review_mode",
            EventMsg::ExitedReviewMode { .. } => "exited_review_mode",
            EventMsg::TurnAborted { .. } => "turn_aborted",
            EventMsg::AgentMessageDelta { .. } => "agent_message_delta",
            EventMsg::AgentReasoningDelta { .. } => "agent_reasoning_delta",
            EventMsg::TaskStarted { .. } => "task_started",
            EventMsg::TaskComplete { .. } => "task_complete",
            EventMsg::SessionConfigured { .. } => "session_configured",
            EventMsg::ExecCommandBegin { .. } => "exec_command_begin",
            EventMsg::ExecCommandEnd { .. } => "exec_command_end",
            EventMsg::Other => "other",
        }
    }
}
