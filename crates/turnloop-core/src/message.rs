//! Conversation Messages
//!
//! Standard message format used across the turn loop. A [`Conversation`] is
//! the literal transcript fed back to the responder on every model call, so
//! it is append-only: insertion order is never changed, only the oldest
//! messages may be dropped by a [`HistoryWindow`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::tool::{ToolCall, ToolStatus};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Tool invocations requested by an assistant message, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Links a tool result back to the request that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Outcome of the tool that produced this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            status: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>, status: ToolStatus) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg.status = Some(status);
        msg
    }

    /// Attach tool call requests to an assistant message
    #[must_use]
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> u32 {
        // ~4 characters per token
        u32::try_from(self.content.len() / 4).unwrap_or(u32::MAX) + 4
    }
}

/// Front-truncation policy applied after each turn.
///
/// Once the conversation holds more than `max_messages`, exactly
/// `drop_count` of the oldest messages are removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryWindow {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    #[serde(default = "default_drop_count")]
    pub drop_count: usize,
}

const fn default_max_messages() -> usize {
    10
}

const fn default_drop_count() -> usize {
    2
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            drop_count: default_drop_count(),
        }
    }
}

/// Conversation history with utility methods.
///
/// Every message ever pushed is retained for the transcript. A history
/// window only moves the start of the live view the responder sees.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,

    /// Index of the first message still in the live view
    #[serde(default)]
    start: usize,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    ///
    /// Tool results must carry a `tool_call_id` issued by an earlier
    /// assistant message in this conversation.
    pub fn push(&mut self, message: Message) -> Result<()> {
        if message.role == Role::Tool {
            let id = message.tool_call_id.as_deref().ok_or_else(|| {
                AgentError::Conversation("tool result without a tool_call_id".into())
            })?;
            if !self.issued(id) {
                return Err(AgentError::Conversation(format!(
                    "tool result references unknown tool call '{id}'"
                )));
            }
        }
        self.messages.push(message);
        Ok(())
    }

    fn issued(&self, id: &str) -> bool {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| &m.tool_calls)
            .any(|call| call.id.as_deref() == Some(id))
    }

    /// Messages in the live view, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages[self.start..]
    }

    /// Every message pushed, including those dropped by a history window
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages().last()
    }

    /// The trailing run of tool results, i.e. the latest tool batch
    pub fn trailing_tool_results(&self) -> &[Message] {
        let live = self.messages();
        let start = live
            .iter()
            .rposition(|m| m.role != Role::Tool)
            .map_or(0, |pos| pos + 1);
        &live[start..]
    }

    /// Apply a history window to the live view, returning how many
    /// messages left it
    pub fn apply_window(&mut self, window: &HistoryWindow) -> usize {
        let live = self.len();
        if live <= window.max_messages {
            return 0;
        }
        let count = window.drop_count.min(live);
        self.start += count;
        count
    }

    /// Rewind the most recent push, if it is still in the live view
    pub fn pop(&mut self) -> Option<Message> {
        if self.is_empty() {
            return None;
        }
        self.messages.pop()
    }

    /// Estimate tokens in the live view
    pub fn estimate_tokens(&self) -> u32 {
        self.messages().iter().map(Message::estimate_tokens).sum()
    }

    /// Number of messages in the live view
    pub fn len(&self) -> usize {
        self.messages.len() - self.start
    }

    /// Check if the live view is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
