//! Responder
//!
//! Turns the conversation into exactly one new assistant message by calling
//! the configured [`LlmProvider`]. Every call is bounded by a timeout and can
//! be aborted through a [`CancellationToken`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::provider::{Completion, CompletionRequest, GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolSchema};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct Responder {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Responder {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GenerationOptions) -> Self {
        Self {
            provider,
            options,
            timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Produce the next assistant message for `conversation`
    pub async fn respond(
        &self,
        system_prompt: &str,
        conversation: &Conversation,
        tools: &[ToolSchema],
    ) -> Result<Message> {
        let request = CompletionRequest {
            system_prompt,
            messages: conversation.messages(),
            tools,
            options: &self.options,
        };

        tracing::debug!(
            model = %self.options.model,
            messages = conversation.len(),
            tokens = conversation.estimate_tokens(),
            "Calling provider"
        );

        let completion = tokio::select! {
            () = self.cancel.cancelled() => return Err(AgentError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.provider.complete(&request)) => {
                result.map_err(|_| AgentError::Timeout(self.timeout))??
            }
        };

        tracing::debug!(
            finish = ?completion.finish_reason,
            tool_calls = completion.tool_calls.len(),
            total_tokens = completion.usage.map(|u| u.total_tokens),
            "Provider replied"
        );
        into_message(completion)
    }
}

/// Validate the provider's tool calls and assign missing call ids.
///
/// Malformed tool-call data is rejected outright rather than guessed at.
fn into_message(completion: Completion) -> Result<Message> {
    let mut seen = HashSet::new();
    let mut calls: Vec<ToolCall> = Vec::with_capacity(completion.tool_calls.len());

    for mut call in completion.tool_calls {
        if call.name.trim().is_empty() {
            return Err(AgentError::MalformedToolCall("tool call without a name".into()));
        }
        let id = call
            .id
            .take()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if !seen.insert(id.clone()) {
            return Err(AgentError::MalformedToolCall(format!("duplicate tool call id '{id}'")));
        }
        call.id = Some(id);
        calls.push(call);
    }

    Ok(Message::assistant(completion.content).with_tool_calls(calls))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ModelInfo, ProviderInfo};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct Fixed(Completion);

    #[async_trait]
    impl LlmProvider for Fixed {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo { name: "fixed".into(), models: Vec::new(), supports_tools: true })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<Completion> {
            Ok(self.0.clone())
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    struct Hanging;

    #[async_trait]
    impl LlmProvider for Hanging {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo { name: "hanging".into(), models: Vec::new(), supports_tools: false })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<Completion> {
            std::future::pending().await
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    fn responder(provider: impl LlmProvider + 'static) -> Responder {
        Responder::new(Arc::new(provider), GenerationOptions::default())
    }

    #[tokio::test]
    async fn test_text_reply() {
        let r = responder(Fixed(Completion::text("Hello!")));
        let msg = r.respond("sys", &Conversation::new(), &[]).await.unwrap();
        assert_eq!(msg.content, "Hello!");
        assert!(msg.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_missing_ids_are_assigned() {
        let calls = vec![
            ToolCall::new("add", HashMap::new()),
            ToolCall::new("add", HashMap::new()).with_id("given"),
        ];
        let r = responder(Fixed(Completion::tool_calls("", calls)));
        let msg = r.respond("sys", &Conversation::new(), &[]).await.unwrap();

        assert_eq!(msg.tool_calls.len(), 2);
        assert!(msg.tool_calls[0].id.as_deref().is_some_and(|id| !id.is_empty()));
        assert_eq!(msg.tool_calls[1].id.as_deref(), Some("given"));
    }

    #[tokio::test]
    async fn test_nameless_call_rejected() {
        let r = responder(Fixed(Completion::tool_calls("", vec![ToolCall::new(" ", HashMap::new())])));
        let err = r.respond("sys", &Conversation::new(), &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedToolCall(_)));
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let calls = vec![
            ToolCall::new("add", HashMap::new()).with_id("same"),
            ToolCall::new("multiply", HashMap::new()).with_id("same"),
        ];
        let r = responder(Fixed(Completion::tool_calls("", calls)));
        let err = r.respond("sys", &Conversation::new(), &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedToolCall(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let r = responder(Hanging).with_timeout(Duration::from_secs(5));
        let err = r.respond("sys", &Conversation::new(), &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_reported_exactly() {
        let r = responder(Hanging).with_timeout(Duration::from_millis(250));
        let err = r.respond("sys", &Conversation::new(), &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(d) if d == Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn test_cancelled() {
        let token = CancellationToken::new();
        let r = responder(Hanging).with_cancellation(token.clone());
        token.cancel();
        let err = r.respond("sys", &Conversation::new(), &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }
}
