//! Session Management
//!
//! A session owns one conversation plus the state its tools mutate.
//! Sessions share nothing, so any number of them can run side by side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Conversation, Role};

const TITLE_CHARS: usize = 50;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-session state handed to tools.
///
/// `prompt_context` lets the state describe itself to the model; it is
/// appended to the system prompt on every call.
pub trait SessionState: Send {
    fn prompt_context(&self) -> Option<String> {
        None
    }
}

impl SessionState for () {}

/// Session metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session title (auto-generated or user-set)
    pub title: Option<String>,

    /// Model used for this session
    pub model: Option<String>,
}

/// A complete agent session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session<S = ()> {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history
    pub conversation: Conversation,

    /// Tool-visible state, private to this session
    pub state: S,

    /// Session metadata
    pub metadata: SessionMetadata,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    /// Whether session is active
    pub active: bool,
}

impl<S> Session<S> {
    /// Create a session around existing state
    pub fn with_state(state: S) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation: Conversation::new(),
            state,
            metadata: SessionMetadata::default(),
            created_at: now,
            updated_at: now,
            active: true,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Explicit title, else the opening of the first user message
    pub fn title(&self) -> String {
        if let Some(title) = &self.metadata.title {
            return title.clone();
        }
        let Some(first) = self.conversation.messages().iter().find(|m| m.role == Role::User) else {
            return format!("Session {}", self.id.as_str().get(..8).unwrap_or_default());
        };

        let mut chars = first.content.chars();
        let preview: String = chars.by_ref().take(TITLE_CHARS).collect();
        if chars.next().is_some() { format!("{preview}...") } else { preview }
    }

    /// End the session
    pub fn end(&mut self) {
        self.active = false;
        self.touch();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}

impl<S: Default> Session<S> {
    /// Create a new session with default state
    pub fn new() -> Self {
        Self::with_state(S::default())
    }
}

impl<S: Default> Default for Session<S> {
    fn default() -> Self {
        Self::new()
    }
}
