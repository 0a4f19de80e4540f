//! Turn Loop
//!
//! Alternates the responder and the tool invoker, as directed by the
//! continuation predicate, until the model answers in free text or a tool
//! signals completion.
//!
//! ```text
//!  user ──▶ Responder ──▶ predicate ──┬──▶ Tools ──▶ predicate ──┬──▶ Responder …
//!                                      │                          └──▶ Halted
//!                                      └──▶ Replied(text)
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::message::{HistoryWindow, Role};
use crate::predicate::{Transition, next_transition};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::responder::Responder;
use crate::session::{Session, SessionState};
use crate::tool::{Tool, ToolRegistry, ToolSchema};

/// Loop configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Base system prompt
    pub system_prompt: String,

    /// Maximum model calls within a single turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Front truncation applied after every turn; `None` keeps everything
    #[serde(default)]
    pub history: Option<HistoryWindow>,
}

const fn default_max_iterations() -> usize {
    10
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: default_max_iterations(),
            history: None,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Be concise and accurate.";

/// How a turn ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered in free text; the loop awaits the next input
    Replied(String),
    /// A tool signalled task completion
    Halted,
}

/// Drives one session's turns
pub struct TurnLoop<S: SessionState> {
    responder: Responder,
    tools: Arc<ToolRegistry<S>>,
    schemas: Vec<ToolSchema>,
    config: LoopConfig,
}

impl<S: SessionState> TurnLoop<S> {
    pub fn new(responder: Responder, tools: Arc<ToolRegistry<S>>, config: LoopConfig) -> Self {
        let schemas = tools.schemas();
        Self {
            responder,
            tools,
            schemas,
            config,
        }
    }

    /// System prompt for the next model call, including state context
    pub fn system_prompt(&self, state: &S) -> String {
        let mut prompt = self.config.system_prompt.clone();
        if let Some(context) = state.prompt_context() {
            prompt.push_str("\n\n");
            prompt.push_str(&context);
        }
        prompt
    }

    /// Run responder and tools until the turn ends.
    ///
    /// The history window, if any, is applied once the turn is over.
    pub async fn run_turn(&self, session: &mut Session<S>) -> Result<TurnOutcome> {
        let mut calls = 0;

        let outcome = loop {
            match next_transition(&session.conversation) {
                Transition::Halt => break TurnOutcome::Halted,
                Transition::ContinueToTools => self.invoke_pending(session).await?,
                Transition::ContinueToResponder => {
                    if let Some(text) = final_reply(session) {
                        break TurnOutcome::Replied(text);
                    }

                    calls += 1;
                    if calls > self.config.max_iterations {
                        return Err(AgentError::MaxIterations(self.config.max_iterations));
                    }

                    let prompt = self.system_prompt(&session.state);
                    let reply = self
                        .responder
                        .respond(&prompt, &session.conversation, &self.schemas)
                        .await?;
                    session.conversation.push(reply)?;
                }
            }
        };

        if let Some(window) = &self.config.history {
            let dropped = session.conversation.apply_window(window);
            if dropped > 0 {
                tracing::debug!(dropped, remaining = session.conversation.len(), "Trimmed history");
            }
        }
        session.touch();

        Ok(outcome)
    }

    /// Execute every tool call on the latest assistant message, in order
    async fn invoke_pending(&self, session: &mut Session<S>) -> Result<()> {
        let calls = session
            .conversation
            .last()
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();

        for call in &calls {
            let result = self.tools.invoke(call, &mut session.state).await?;
            session.conversation.push(result)?;
        }
        Ok(())
    }
}

/// The assistant's free-text answer, if it is the latest message
fn final_reply<S>(session: &Session<S>) -> Option<String> {
    session
        .conversation
        .last()
        .filter(|m| m.role == Role::Assistant && !m.has_tool_calls())
        .map(|m| m.content.clone())
}

/// Builder for turn loops
pub struct TurnLoopBuilder<S: SessionState> {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry<S>,
    generation: GenerationOptions,
    config: LoopConfig,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl<S: SessionState> Default for TurnLoopBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SessionState> TurnLoopBuilder<S> {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            generation: GenerationOptions::default(),
            config: LoopConfig::default(),
            timeout: None,
            cancel: None,
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register a tool; duplicates surface when the loop is built
    pub fn tool<T: Tool<S> + 'static>(mut self, tool: T) -> Result<Self> {
        self.tools.register(tool)?;
        Ok(self)
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry<S>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn generation(mut self, options: GenerationOptions) -> Self {
        self.generation = options;
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn history(mut self, window: Option<HistoryWindow>) -> Self {
        self.config.history = window;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Result<TurnLoop<S>> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }
        if self.config.history.is_some_and(|w| w.drop_count == 0) {
            return Err(AgentError::Config("history window must drop at least 1 message".into()));
        }

        let mut responder = Responder::new(provider, self.generation);
        if let Some(timeout) = self.timeout {
            responder = responder.with_timeout(timeout);
        }
        if let Some(token) = self.cancel {
            responder = responder.with_cancellation(token);
        }

        Ok(TurnLoop::new(responder, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::provider::{Completion, CompletionRequest, ModelInfo, ProviderInfo};
    use crate::tool::{ParameterSchema, ToolCall, ToolResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replays canned completions and records the prompts it saw
    #[derive(Default)]
    struct Replay {
        script: Mutex<VecDeque<Completion>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Replay {
        fn new(script: Vec<Completion>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                prompts: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for Replay {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo { name: "replay".into(), models: Vec::new(), supports_tools: true })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
            self.prompts.lock().unwrap().push(request.system_prompt.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct Notes(Vec<String>);

    impl SessionState for Notes {
        fn prompt_context(&self) -> Option<String> {
            Some(format!("Notes so far: {}", self.0.len()))
        }
    }

    struct Note {
        finish: bool,
    }

    #[async_trait]
    impl Tool<Notes> for Note {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: if self.finish { "finish".into() } else { "note".into() },
                description: "Record a note".into(),
                parameters: vec![ParameterSchema::required("text", "string", "Note text")],
            }
        }

        async fn execute(&self, call: &ToolCall, state: &mut Notes) -> Result<ToolResult> {
            state.0.push(call.str_arg("text")?.to_string());
            if self.finish {
                Ok(ToolResult::completed("finish", "done"))
            } else {
                Ok(ToolResult::success("note", "noted"))
            }
        }
    }

    fn call(name: &str, text: &str) -> ToolCall {
        let mut args = HashMap::new();
        args.insert("text".to_string(), json!(text));
        ToolCall::new(name, args)
    }

    fn notes_loop(provider: Arc<Replay>) -> TurnLoop<Notes> {
        TurnLoopBuilder::new()
            .provider(provider)
            .system_prompt("Take notes.")
            .tool(Note { finish: false })
            .unwrap()
            .tool(Note { finish: true })
            .unwrap()
            .max_iterations(4)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_tools_then_reply() {
        let provider = Replay::new(vec![
            Completion::tool_calls("", vec![call("note", "a"), call("note", "b")]),
            Completion::text("Two notes taken."),
        ]);
        let turn_loop = notes_loop(provider.clone());
        let mut session: Session<Notes> = Session::new();
        session.conversation.push(Message::user("note a and b")).unwrap();

        let outcome = turn_loop.run_turn(&mut session).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Replied("Two notes taken.".into()));
        assert_eq!(session.state.0, ["a", "b"]);
        // user, assistant(calls), tool, tool, assistant
        assert_eq!(session.conversation.len(), 5);

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts[0], "Take notes.\n\nNotes so far: 0");
        assert_eq!(prompts[1], "Take notes.\n\nNotes so far: 2");
    }

    #[tokio::test]
    async fn test_completion_halts_without_another_call() {
        let provider = Replay::new(vec![Completion::tool_calls("", vec![call("finish", "x")])]);
        let turn_loop = notes_loop(provider.clone());
        let mut session: Session<Notes> = Session::new();
        session.conversation.push(Message::user("finish")).unwrap();

        let outcome = turn_loop.run_turn(&mut session).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Halted);
        assert_eq!(provider.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts() {
        let provider = Replay::new(vec![Completion::tool_calls("", vec![call("divide", "x")])]);
        let turn_loop = notes_loop(provider);
        let mut session: Session<Notes> = Session::new();
        session.conversation.push(Message::user("divide")).unwrap();

        let err = turn_loop.run_turn(&mut session).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let script = (0..5).map(|_| Completion::tool_calls("", vec![call("note", "x")])).collect();
        let turn_loop = notes_loop(Replay::new(script));
        let mut session: Session<Notes> = Session::new();
        session.conversation.push(Message::user("loop forever")).unwrap();

        let err = turn_loop.run_turn(&mut session).await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterations(4)));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let turn_loop = notes_loop(Replay::new(Vec::new()));
        let mut session: Session<Notes> = Session::new();
        session.conversation.push(Message::user("hi")).unwrap();

        let err = turn_loop.run_turn(&mut session).await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn test_history_window_after_turn() {
        let script = (0..6).map(|i| Completion::text(format!("a{i}"))).collect();
        let turn_loop: TurnLoop<()> = TurnLoopBuilder::new()
            .provider(Replay::new(script))
            .history(Some(HistoryWindow::default()))
            .build()
            .unwrap();
        let mut session: Session = Session::new();

        for i in 0..6 {
            session.conversation.push(Message::user(format!("q{i}"))).unwrap();
            turn_loop.run_turn(&mut session).await.unwrap();
        }

        // 12 messages would exceed 10; the oldest pair went after turn 6
        assert_eq!(session.conversation.len(), 10);
        assert_eq!(session.conversation.messages()[0].content, "q1");
        assert_eq!(session.conversation.last().unwrap().content, "a5");
        assert_eq!(session.conversation.history().len(), 12);
    }

    #[test]
    fn test_build_rejects_window_that_never_drops() {
        let window = HistoryWindow { max_messages: 10, drop_count: 0 };
        let result: Result<TurnLoop<()>> = TurnLoopBuilder::new()
            .provider(Replay::new(Vec::new()))
            .history(Some(window))
            .build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_build_requires_provider() {
        let result: Result<TurnLoop<()>> = TurnLoopBuilder::new().build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }
}
