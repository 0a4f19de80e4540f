//! # turnloop-runtime
//!
//! LLM providers for the turnloop agents.
//!
//! ## Providers
//!
//! - **Ollama** (`ollama` feature): local inference, tools via the text protocol
//! - **OpenAI-compatible** (`openai` feature): hosted or local Chat Completions
//!   endpoints with native function calling
//! - **Mock**: scripted completions for tests and demos
//!
//! ## Usage
//!
//! ```rust,ignore
//! use turnloop_runtime::OllamaProvider;
//!
//! let provider = OllamaProvider::from_env();
//! let turn_loop = TurnLoopBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

pub mod mock;
pub mod text_protocol;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use mock::MockProvider;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use turnloop_core::{
    AgentError, Completion, LlmProvider, Message, Result, Role, Session, Tool, ToolRegistry,
    TurnLoop,
};
