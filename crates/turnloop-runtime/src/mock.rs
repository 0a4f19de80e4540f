//! Mock Provider
//!
//! For testing and demo purposes. Replays a fixed script of completions and
//! records every request it receives.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use turnloop_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{Completion, CompletionRequest, LlmProvider, ModelInfo, ProviderInfo},
};

/// A request as seen by the mock
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// Scripted provider
#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<Completion>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockProvider {
    pub fn new(script: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    /// Queue another completion
    pub fn push(&self, completion: Completion) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(completion);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Completions not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: "Mock".into(),
            models: self.list_models().await?,
            supports_tools: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true) // Mock always healthy
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                system_prompt: request.system_prompt.to_string(),
                messages: request.messages.to_vec(),
                tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            });

        let mut completion = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| AgentError::ProviderUnavailable("mock script exhausted".into()))?;
        if completion.model.is_empty() {
            completion.model.clone_from(&request.options.model);
        }
        Ok(completion)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "mock".into(),
            name: "Mock".into(),
            context_length: None,
        }])
    }
}
