//! Agent Presets
//!
//! The three bundled agents, each a thin specialisation of [`TurnLoop`]:
//!
//! - [`Chatbot`]: no tools, sliding history window, one reply per input
//! - [`Drafter`]: `update`/`save`, halts once the document is saved
//! - [`ReactAgent`]: arithmetic tools, one query, halts on a plain answer

use std::sync::Arc;
use std::time::Duration;

use turnloop_core::{
    AgentError, CancellationToken, GenerationOptions, HistoryWindow, LlmProvider, Message,
    Result, Session, SessionState, TurnLoop, TurnLoopBuilder, TurnOutcome,
};

use crate::document::{self, DocumentState};
use crate::prompts::{CHATBOT_PROMPT, DRAFTER_OPENING, DRAFTER_PROMPT, REACT_PROMPT};
use crate::arithmetic;

/// Settings shared by every preset
#[derive(Clone, Debug)]
pub struct AgentSettings {
    pub generation: GenerationOptions,

    /// Maximum model calls per turn
    pub max_iterations: usize,

    /// Deadline for a single model call
    pub timeout: Duration,

    /// Chatbot history window
    pub history: HistoryWindow,

    pub cancel: CancellationToken,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            generation: GenerationOptions::default(),
            max_iterations: 10,
            timeout: Duration::from_secs(120),
            history: HistoryWindow::default(),
            cancel: CancellationToken::new(),
        }
    }
}

fn builder<S: SessionState>(
    provider: Arc<dyn LlmProvider>,
    settings: &AgentSettings,
    prompt: &str,
) -> TurnLoopBuilder<S> {
    TurnLoopBuilder::new()
        .provider(provider)
        .generation(settings.generation.clone())
        .system_prompt(prompt)
        .max_iterations(settings.max_iterations)
        .timeout(settings.timeout)
        .cancellation(settings.cancel.clone())
}

/// Push `input` and run one turn.
///
/// A retryable failure before the model answered takes the input back so
/// the user can resend it. Any other failure ends the session.
async fn run_input<S: SessionState>(
    turn_loop: &TurnLoop<S>,
    session: &mut Session<S>,
    input: &str,
) -> Result<TurnOutcome> {
    if !session.active {
        return Err(AgentError::Conversation("session already finished".into()));
    }

    let mark = session.conversation.len();
    session.conversation.push(Message::user(input))?;

    match turn_loop.run_turn(session).await {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_retryable() => {
            if session.conversation.len() == mark + 1 {
                session.conversation.pop();
            }
            Err(e)
        }
        Err(e) => {
            tracing::warn!(session = %session.id, error = %e, "Ending session");
            session.end();
            Err(e)
        }
    }
}

// ============================================================================
// Chatbot
// ============================================================================

/// Memory-preserving chatbot
pub struct Chatbot {
    turn_loop: TurnLoop<()>,
    session: Session,
}

impl Chatbot {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &AgentSettings) -> Result<Self> {
        let turn_loop = builder(provider, settings, CHATBOT_PROMPT)
            .history(Some(settings.history))
            .build()?;
        let mut session = Session::new();
        session.metadata.model = Some(settings.generation.model.clone());

        Ok(Self { turn_loop, session })
    }

    /// Send one line of input and return the reply
    pub async fn send(&mut self, input: &str) -> Result<String> {
        match run_input(&self.turn_loop, &mut self.session, input).await? {
            TurnOutcome::Replied(text) => Ok(text),
            TurnOutcome::Halted => Ok(String::new()),
        }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Mark the conversation as over
    pub fn finish(&mut self) -> &Session {
        self.session.end();
        &self.session
    }
}

// ============================================================================
// Drafter
// ============================================================================

/// Document drafting assistant
pub struct Drafter {
    turn_loop: TurnLoop<DocumentState>,
    session: Session<DocumentState>,
}

impl Drafter {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        settings: &AgentSettings,
        document: DocumentState,
    ) -> Result<Self> {
        let turn_loop = builder(provider, settings, DRAFTER_PROMPT)
            .tools(document::registry()?)
            .build()?;
        let mut session = Session::with_state(document);
        session.metadata.model = Some(settings.generation.model.clone());

        Ok(Self { turn_loop, session })
    }

    /// Open the session with the fixed greeting
    pub async fn start(&mut self) -> Result<TurnOutcome> {
        self.send(DRAFTER_OPENING).await
    }

    /// Run one turn for a user instruction
    pub async fn send(&mut self, input: &str) -> Result<TurnOutcome> {
        let outcome = run_input(&self.turn_loop, &mut self.session, input).await?;
        if outcome == TurnOutcome::Halted {
            self.session.end();
        }
        Ok(outcome)
    }

    pub const fn document(&self) -> &DocumentState {
        &self.session.state
    }

    pub const fn session(&self) -> &Session<DocumentState> {
        &self.session
    }

    pub const fn is_finished(&self) -> bool {
        !self.session.active
    }
}

// ============================================================================
// ReAct
// ============================================================================

/// Arithmetic ReAct agent
pub struct ReactAgent {
    turn_loop: TurnLoop<()>,
}

/// Result of one ReAct run
#[derive(Debug)]
pub struct ReactRun {
    pub answer: String,
    pub session: Session,
}

impl ReactAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &AgentSettings) -> Result<Self> {
        let turn_loop = builder(provider, settings, REACT_PROMPT)
            .tools(arithmetic::registry()?)
            .build()?;
        Ok(Self { turn_loop })
    }

    /// Answer a single query; every run gets a fresh session
    pub async fn run(&self, query: &str) -> Result<ReactRun> {
        let mut session = Session::new();
        session.conversation.push(Message::user(query))?;

        let answer = match self.turn_loop.run_turn(&mut session).await? {
            TurnOutcome::Replied(text) => text,
            TurnOutcome::Halted => session
                .conversation
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        };
        session.end();

        Ok(ReactRun { answer, session })
    }
}
