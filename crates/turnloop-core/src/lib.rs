//! # turnloop-core
//!
//! Provider-agnostic turn loop for tool-using chat agents.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         TurnLoop                             │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │ Continuation│  │    Tools     │  │  Responder          │  │
//! │  │  Predicate  │──│   Registry   │──│  (LlmProvider)      │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────┘  │
//! │                  Session { Conversation, state }             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets the same loop run against Ollama, an
//! OpenAI-compatible endpoint, or a scripted mock.

pub mod error;
pub mod message;
pub mod predicate;
pub mod provider;
pub mod responder;
pub mod session;
pub mod tool;
pub mod transcript;
pub mod turn;

pub use error::{AgentError, Result};
pub use message::{Conversation, HistoryWindow, Message, Role};
pub use predicate::{Transition, next_transition};
pub use provider::{Completion, CompletionRequest, GenerationOptions, LlmProvider};
pub use responder::Responder;
pub use session::{Session, SessionId, SessionState};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema, ToolStatus};
pub use turn::{LoopConfig, TurnLoop, TurnLoopBuilder, TurnOutcome};

// Re-exported so tool crates need not depend on tokio-util directly
pub use tokio_util::sync::CancellationToken;
