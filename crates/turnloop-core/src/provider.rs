//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all LLM backends (Ollama, OpenAI-compatible
//! endpoints, scripted mocks) so the turn loop works with any of them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use turnloop_core::provider::{CompletionRequest, LlmProvider};
//!
//! let provider = OllamaProvider::from_env();
//! let completion = provider.complete(&request).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "gpt-4o")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

const fn default_temperature() -> f32 { 0.7 }
const fn default_max_tokens() -> u32 { 2048 }
const fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }
}

/// Everything a provider needs for one model call
#[derive(Clone, Copy, Debug)]
pub struct CompletionRequest<'a> {
    /// Fixed instruction placed ahead of the conversation
    pub system_prompt: &'a str,

    /// Full conversation history, oldest first
    pub messages: &'a [Message],

    /// Tools the model may request
    pub tools: &'a [ToolSchema],

    pub options: &'a GenerationOptions,
}

/// Response from an LLM completion
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Requested tool invocations, in order
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Plain text answer
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        }
    }

    /// Answer requesting tool calls
    pub fn tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls: calls,
            finish_reason: Some(FinishReason::ToolUse),
            ..Default::default()
        }
    }
}

/// Token counts as reported by the backend
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// Provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "Ollama", "OpenAI")
    pub name: String,

    /// Available models
    pub models: Vec<ModelInfo>,

    /// Whether tool/function calling is native to the API
    pub supports_tools: bool,
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_length: Option<u32>,
}

/// A model backend.
///
/// `complete` is the only call made during a turn; the rest serve startup
/// checks and the `models` command.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider information and capabilities
    async fn info(&self) -> Result<ProviderInfo>;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert!((opts.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "llama3.2");
    }

    #[test]
    fn test_generation_options_from_partial_json() {
        let opts: GenerationOptions = serde_json::from_str(r#"{"model": "gpt-4o"}"#).unwrap();
        assert_eq!(opts.model, "gpt-4o");
        assert_eq!(opts.max_tokens, 2048);
    }

    #[test]
    fn test_completion_constructors() {
        let text = Completion::text("128");
        assert!(text.tool_calls.is_empty());
        assert_eq!(text.finish_reason, Some(FinishReason::Stop));

        let calls = Completion::tool_calls("", vec![ToolCall::new("add", HashMap::new())]);
        assert_eq!(calls.tool_calls.len(), 1);
        assert_eq!(calls.finish_reason, Some(FinishReason::ToolUse));
    }
}
