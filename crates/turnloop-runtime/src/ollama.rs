//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. Tool calls
//! go through the fenced-block text protocol.

use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, MessageRole, request::ChatMessageRequest},
    models::ModelOptions,
};
use turnloop_core::{
    error::{AgentError, Result},
    message::Role,
    provider::{
        Completion, CompletionRequest, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ProviderInfo,
    },
    tool::prompt_section,
};

use crate::text_protocol;

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);

        Self { host, port }
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
}

impl OllamaProvider {
    /// Create from configuration
    pub fn from_config(config: &OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(&OllamaConfig::from_env())
    }

    /// Convert the request into Ollama chat messages.
    ///
    /// Tool descriptions ride along in the system prompt and tool results are
    /// presented as user context.
    fn convert_messages(request: &CompletionRequest<'_>) -> Vec<ChatMessage> {
        let mut system = request.system_prompt.to_string();
        if !request.tools.is_empty() {
            system.push_str("\n\n");
            system.push_str(&prompt_section(request.tools));
        }

        let mut messages = vec![ChatMessage::new(MessageRole::System, system)];
        messages.extend(request.messages.iter().map(|m| {
            let role = match m.role {
                Role::System => MessageRole::System,
                Role::User | Role::Tool => MessageRole::User,
                Role::Assistant => MessageRole::Assistant,
            };
            ChatMessage::new(role, text_protocol::render_message(m))
        }));
        messages
    }

    /// Build Ollama model options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        let options = ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX));
        if opts.stop_sequences.is_empty() {
            options
        } else {
            options.stop(opts.stop_sequences.clone())
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "Ollama".into(),
            models,
            supports_tools: false,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let chat = ChatMessageRequest::new(
            request.options.model.clone(),
            Self::convert_messages(request),
        )
        .options(Self::build_options(request.options));

        let response = self
            .client
            .send_chat_messages(chat)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let (content, tool_calls) = text_protocol::parse_reply(&response.message.content)?;
        let finish_reason = if tool_calls.is_empty() { FinishReason::Stop } else { FinishReason::ToolUse };

        Ok(Completion {
            content,
            tool_calls,
            model: request.options.model.clone(),
            usage: None,
            finish_reason: Some(finish_reason),
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                context_length: None,
            })
            .collect())
    }
}
