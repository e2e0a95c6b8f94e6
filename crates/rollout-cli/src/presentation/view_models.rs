use chrono::{DateTime, Utc};
use rollout_runtime::{CleanupReport, ConversationPage, ConversationSummary, ItemRecord};
use rollout_types::{EventMsg, ResponseItem, RolloutItem, format_timestamp, truncate};
use serde::Serialize;
use std::fmt;

const SUMMARY_MAX_CHARS: usize = 80;

#[derive(Debug, Serialize)]
pub struct CommandResultViewModel<T>
where
    T: Serialize,
{
    pub content: T,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Guidance>,
}

impl<T> CommandResultViewModel<T>
where
    T: Serialize,
{
    pub fn new(content: T) -> Self {
        Self {
            content,
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, guide: Guidance) -> Self {
        self.suggestions.push(guide);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct Guidance {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl Guidance {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}

// --------------------------------------------------------------------------
// list

#[derive(Debug, Serialize)]
pub struct ConversationListView {
    pub conversations: Vec<ConversationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub num_scanned: usize,
    pub reached_cap: bool,
}

impl From<ConversationPage> for ConversationListView {
    fn from(page: ConversationPage) -> Self {
        Self {
            conversations: page.items,
            next_cursor: page.next_cursor.map(|cursor| cursor.encode()),
            num_scanned: page.num_scanned,
            reached_cap: page.reached_cap,
        }
    }
}

impl fmt::Display for ConversationListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conversations.is_empty() {
            writeln!(f, "No conversations found.")?;
            return Ok(());
        }

        for summary in &self.conversations {
            writeln!(
                f,
                "{}  {}  {:>5}  {}",
                summary.id,
                format_time(summary.updated),
                summary.item_count,
                summary
                    .preview
                    .as_deref()
                    .map(|text| truncate(&one_line(text), SUMMARY_MAX_CHARS))
                    .unwrap_or_else(|| "(no preview)".to_string())
            )?;
        }
        Ok(())
    }
}

// --------------------------------------------------------------------------
// history

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub session_id: String,
    pub items: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub sequence: u64,
    pub timestamp: String,
    #[serde(flatten)]
    pub item: RolloutItem,
}

impl HistoryView {
    pub fn new(session_id: String, records: Vec<ItemRecord>) -> Self {
        let items = records
            .into_iter()
            .map(|record| HistoryEntry {
                sequence: record.sequence,
                timestamp: format_timestamp(record.timestamp),
                item: record.item,
            })
            .collect();
        Self { session_id, items }
    }
}

impl fmt::Display for HistoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session {} ({} items)", self.session_id, self.items.len())?;
        for entry in &self.items {
            writeln!(
                f,
                "{:>5}  {}  {:<13}  {}",
                entry.sequence,
                entry.timestamp,
                entry.item.kind(),
                describe_item(&entry.item)
            )?;
        }
        Ok(())
    }
}

/// One-line human summary of an item
pub fn describe_item(item: &RolloutItem) -> String {
    let text = match item {
        RolloutItem::SessionMeta(meta) => format!(
            "{} {} in {}",
            meta.meta.originator,
            meta.meta.cli_version,
            meta.meta.cwd.display()
        ),
        RolloutItem::ResponseItem(response) => match response {
            ResponseItem::Message { role, content } => {
                format!("{}: {}", role.as_deref().unwrap_or("message"), content)
            }
            ResponseItem::FunctionCall { name, arguments, .. } => {
                format!("call {}({})", name, arguments)
            }
            ResponseItem::CustomToolCall { name, input, .. } => format!("call {}({})", name, input),
            ResponseItem::FunctionCallOutput { output, .. }
            | ResponseItem::CustomToolCallOutput { output, .. } => format!("output: {}", output),
            ResponseItem::LocalShellCall { command, status, .. } => {
                format!("shell [{}] {}", status, command.join(" "))
            }
            other => other.type_name().to_string(),
        },
        RolloutItem::Compacted(compacted) => format!("compacted: {}", compacted.message),
        RolloutItem::TurnContext(ctx) => format!("turn {} in {}", ctx.model, ctx.cwd.display()),
        RolloutItem::Event(event) => match event {
            EventMsg::UserMessage { message, .. } => format!("user: {}", message),
            EventMsg::AgentMessage { message } => format!("agent: {}", message),
            EventMsg::AgentReasoning { text } => format!("reasoning: {}", text),
            EventMsg::TurnAborted { reason } => format!("aborted: {}", reason),
            other => other.type_name().to_string(),
        },
    };
    truncate(&one_line(&text), SUMMARY_MAX_CHARS)
}

// --------------------------------------------------------------------------
// maintenance

#[derive(Debug, Serialize)]
pub struct CleanupView {
    #[serde(flatten)]
    pub report: CleanupReport,
}

impl fmt::Display for CleanupView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deleted {} expired session(s)", self.report.deleted)?;
        if self.report.skipped > 0 {
            write!(f, ", skipped {} with live writers", self.report.skipped)?;
        }
        if self.report.failed > 0 {
            write!(f, ", {} failed", self.report.failed)?;
        }
        writeln!(f)
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteView {
    pub session_id: String,
    pub deleted: bool,
}

impl fmt::Display for DeleteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deleted {
            writeln!(f, "Deleted session {}", self.session_id)
        } else {
            writeln!(f, "Session {} not found", self.session_id)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportView {
    pub session_id: String,
    pub lines: usize,
    pub path: String,
}

impl fmt::Display for ExportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Exported {} line(s) of session {} to {}",
            self.lines, self.session_id, self.path
        )
    }
}

#[derive(Debug, Serialize)]
pub struct RecordView {
    pub session_id: String,
    /// Items read from input (before the persistence policy)
    pub received: usize,
    pub created: bool,
}

impl fmt::Display for RecordView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.created { "Created" } else { "Appended to" };
        writeln!(
            f,
            "{} session {} ({} item(s) received)",
            verb, self.session_id, self.received
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ImportView {
    pub session_id: String,
}

impl fmt::Display for ImportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Imported session {}", self.session_id)
    }
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
